//! The fixed set of thematic categories used by the Berlin registry.

use serde::Serialize;

/// One entry of the category table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    /// CKAN group name, usable as a search filter
    pub id: &'static str,
    /// Title as shown on daten.berlin.de
    pub label: &'static str,
    pub description: &'static str,
}

/// All 25 categories, ordered by id.
pub static CATEGORIES: [Category; 25] = [
    Category {
        id: "arbeit",
        label: "Arbeit",
        description: "Labour market, employment and vocational training",
    },
    Category {
        id: "bildung",
        label: "Bildung",
        description: "Schools, daycare (Kita), universities and adult education",
    },
    Category {
        id: "demographie",
        label: "Demographie",
        description: "Population, residents and household statistics",
    },
    Category {
        id: "erholung",
        label: "Erholung",
        description: "Parks, green spaces, sports and leisure",
    },
    Category {
        id: "geo",
        label: "Geographie, Geoplanung und stadtnahe Infrastruktur",
        description: "Geodata, maps, urban planning and land use",
    },
    Category {
        id: "gesundheit",
        label: "Gesundheit",
        description: "Health care, hospitals and public health",
    },
    Category {
        id: "gleichstellung",
        label: "Gleichstellung",
        description: "Equal opportunities and anti-discrimination",
    },
    Category {
        id: "jugend",
        label: "Jugend",
        description: "Youth services and family support",
    },
    Category {
        id: "justiz",
        label: "Justiz",
        description: "Courts, prisons and legal services",
    },
    Category {
        id: "kultur",
        label: "Kunst und Kultur",
        description: "Museums, theatres, libraries and events",
    },
    Category {
        id: "oeffentlich",
        label: "Öffentliche Verwaltung, Haushalt und Steuern",
        description: "Public budget, taxes and administrative finance",
    },
    Category {
        id: "protokolle",
        label: "Protokolle und Beschlüsse",
        description: "Minutes and resolutions of parliament and district assemblies",
    },
    Category {
        id: "sicherheit",
        label: "Öffentliche Sicherheit",
        description: "Police, fire brigade, crime and civil protection",
    },
    Category {
        id: "sonstiges",
        label: "Sonstiges",
        description: "Datasets without a more specific category",
    },
    Category {
        id: "sozial",
        label: "Sozialleistungen",
        description: "Social benefits, welfare and care services",
    },
    Category {
        id: "tourismus",
        label: "Tourismus",
        description: "Visitors, hotels and sights",
    },
    Category {
        id: "transport",
        label: "Transport",
        description: "Public transport, logistics and mobility services",
    },
    Category {
        id: "umwelt",
        label: "Umwelt und Klima",
        description: "Environment, climate, air quality, noise and water",
    },
    Category {
        id: "verbraucher",
        label: "Verbraucherschutz",
        description: "Consumer protection and food safety",
    },
    Category {
        id: "verentsorgung",
        label: "Ver- und Entsorgung",
        description: "Utilities, energy supply and waste management",
    },
    Category {
        id: "verkehr",
        label: "Verkehr",
        description: "Road traffic, cycling, parking and accidents",
    },
    Category {
        id: "verwaltung",
        label: "Verwaltung",
        description: "Administrative services, authorities and offices",
    },
    Category {
        id: "wahl",
        label: "Wahlen",
        description: "Election results and polling stations",
    },
    Category {
        id: "wirtschaft",
        label: "Wirtschaft",
        description: "Businesses, trade, markets and economic indicators",
    },
    Category {
        id: "wohnen",
        label: "Wohnen",
        description: "Housing, rents and construction",
    },
];

/// All categories in table order.
pub fn all() -> &'static [Category] {
    &CATEGORIES
}

/// Look up a category by id (case-insensitive).
pub fn find(id: &str) -> Option<&'static Category> {
    let id = id.trim();
    CATEGORIES.iter().find(|c| c.id.eq_ignore_ascii_case(id))
}

/// Comma separated list of valid ids, for help texts and error messages.
pub fn ids() -> String {
    CATEGORIES.iter().map(|c| c.id).collect::<Vec<_>>().join(", ")
}
