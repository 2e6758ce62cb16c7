// Reference data tables: locality and crop codes, responsibles, provinces

use std::collections::HashMap;

/// Locality name/code pairs as they appear in the field books. Codes are not
/// unique across localities (several share "CH" or "TA"); only names are.
pub const LOCALITIES: [(&str, &str); 50] = [
    ("9 de Julio", "9J"),
    ("Amenabar", "AMB"),
    ("Balcarce", "BCE"),
    ("Baradero", "BA"),
    ("Bigand", "BIG"),
    ("Bunge", "BU"),
    ("Catrilo", "CA"),
    ("Chacabuco", "CH"),
    ("Chillar", "CH"),
    ("Chivilcoy", "CH"),
    ("Christophersen", "CT"),
    ("Colonia Tirolesa", "CT"),
    ("Córdoba", "CBA"),
    ("Diego de alvear", "DA"),
    ("Heavy", "HE"),
    ("Iraola", "TA"),
    ("Isla Verde", "IV"),
    ("Laguna larga", "LL"),
    ("Las Rosas", "LR"),
    ("Lonquimay", "LQ"),
    ("Los Toldos", "LT"),
    ("Madariaga", "MD"),
    ("Marcos Juarez", "MJ"),
    ("Miramar", "MR"),
    ("Montes de Oca", "MO"),
    ("Nogoya", "ER"),
    ("Orense", "OR"),
    ("Ortiz Basualdo", "OB"),
    ("Otamendi", "OT"),
    ("Pergamino", "PG"),
    ("Piedritas", "PD"),
    ("Pieres", "PR"),
    ("Rancagua", "RC"),
    ("Rio Cuarto", "RC"),
    ("Rojas", "RO"),
    ("Rosario", "RS"),
    ("Saladillo", "SL"),
    ("Salto", "SA"),
    ("San Agustín", "BCE"),
    ("San Jerónimo", "SJ"),
    ("San Juan", "SJN"),
    ("San Justo", "SJU"),
    ("Tandil", "TA"),
    ("Tres Arroyos", "TA"),
    ("Tucuman", "TU"),
    ("Victoria", "VC"),
    ("Mar del Plata", "MDP"),
    ("Loberia", "LB"),
    ("Necochea", "NC"),
    ("Mendoza", "MDZ"),
];

pub const CROPS: [(&str, &str); 15] = [
    ("Arveja", "AV"),
    ("Cebada", "CB"),
    ("Girasol", "GS"),
    ("Maní", "MN"),
    ("Maiz", "MZ"),
    ("Papa", "PP"),
    ("Soja", "SJ"),
    ("Trigo", "TR"),
    ("Tomate", "TT"),
    ("Garbanzo", "GB"),
    ("Pastura", "PT"),
    ("S/C", "S/C"),
    ("Ajo", "AJ"),
    ("Sorgo", "SG"),
    ("Zanahoria", "ZH"),
];

pub const RESPONSIBLES: [&str; 10] = [
    "Rocio Dominguez",
    "Manuel Aguirre Saravia",
    "Ensayo",
    "Demoplot",
    "Honorio",
    "Agidea",
    "Pablo Gobet",
    "Gonzalez Montaner",
    "Agrar del Sur",
    "Agroconsultor",
];

pub const PROVINCES: [&str; 8] = [
    "Buenos Aires",
    "Santa Fé",
    "Entre Ríos",
    "Córdoba",
    "La Pampa",
    "San Juan",
    "Tucuman",
    "Mendoza",
];

/// Name-to-code lookup maps, built once at startup.
pub struct Catalog {
    localities: HashMap<&'static str, &'static str>,
    crops: HashMap<&'static str, &'static str>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            localities: LOCALITIES.iter().copied().collect(),
            crops: CROPS.iter().copied().collect(),
        }
    }

    pub fn locality_code(&self, name: &str) -> Option<&'static str> {
        self.localities.get(name).copied()
    }

    pub fn crop_code(&self, name: &str) -> Option<&'static str> {
        self.crops.get(name).copied()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
