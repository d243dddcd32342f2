//! Static town-to-province lookup.
//!
//! A town or suburb is identifying; its province is not. The sanitiser
//! generalises location with this table and drops the town entirely when
//! it is not listed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// South African provinces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Province {
    EasternCape,
    FreeState,
    Gauteng,
    KwaZuluNatal,
    Limpopo,
    Mpumalanga,
    NorthernCape,
    NorthWest,
    WesternCape,
}

impl Province {
    pub fn name(&self) -> &'static str {
        match self {
            Province::EasternCape => "Eastern Cape",
            Province::FreeState => "Free State",
            Province::Gauteng => "Gauteng",
            Province::KwaZuluNatal => "KwaZulu-Natal",
            Province::Limpopo => "Limpopo",
            Province::Mpumalanga => "Mpumalanga",
            Province::NorthernCape => "Northern Cape",
            Province::NorthWest => "North West",
            Province::WesternCape => "Western Cape",
        }
    }

    pub fn all() -> &'static [Province] {
        &[
            Province::EasternCape,
            Province::FreeState,
            Province::Gauteng,
            Province::KwaZuluNatal,
            Province::Limpopo,
            Province::Mpumalanga,
            Province::NorthernCape,
            Province::NorthWest,
            Province::WesternCape,
        ]
    }
}

impl fmt::Display for Province {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Towns and suburbs with their containing province.
static TOWN_PROVINCES: &[(&str, Province)] = &[
    // Gauteng
    ("johannesburg", Province::Gauteng),
    ("pretoria", Province::Gauteng),
    ("soweto", Province::Gauteng),
    ("sandton", Province::Gauteng),
    ("tembisa", Province::Gauteng),
    ("benoni", Province::Gauteng),
    ("boksburg", Province::Gauteng),
    ("vereeniging", Province::Gauteng),
    ("krugersdorp", Province::Gauteng),
    ("centurion", Province::Gauteng),
    // Western Cape
    ("cape town", Province::WesternCape),
    ("stellenbosch", Province::WesternCape),
    ("khayelitsha", Province::WesternCape),
    ("mitchells plain", Province::WesternCape),
    ("paarl", Province::WesternCape),
    ("george", Province::WesternCape),
    ("worcester", Province::WesternCape),
    // KwaZulu-Natal
    ("durban", Province::KwaZuluNatal),
    ("pietermaritzburg", Province::KwaZuluNatal),
    ("umlazi", Province::KwaZuluNatal),
    ("newcastle", Province::KwaZuluNatal),
    ("richards bay", Province::KwaZuluNatal),
    ("ladysmith", Province::KwaZuluNatal),
    // Eastern Cape
    ("gqeberha", Province::EasternCape),
    ("port elizabeth", Province::EasternCape),
    ("east london", Province::EasternCape),
    ("mthatha", Province::EasternCape),
    ("makhanda", Province::EasternCape),
    ("queenstown", Province::EasternCape),
    // Free State
    ("bloemfontein", Province::FreeState),
    ("welkom", Province::FreeState),
    ("bethlehem", Province::FreeState),
    ("kroonstad", Province::FreeState),
    // Limpopo
    ("polokwane", Province::Limpopo),
    ("thohoyandou", Province::Limpopo),
    ("tzaneen", Province::Limpopo),
    ("mokopane", Province::Limpopo),
    // Mpumalanga
    ("mbombela", Province::Mpumalanga),
    ("nelspruit", Province::Mpumalanga),
    ("witbank", Province::Mpumalanga),
    ("emalahleni", Province::Mpumalanga),
    ("secunda", Province::Mpumalanga),
    // Northern Cape
    ("kimberley", Province::NorthernCape),
    ("upington", Province::NorthernCape),
    ("springbok", Province::NorthernCape),
    // North West
    ("rustenburg", Province::NorthWest),
    ("mahikeng", Province::NorthWest),
    ("potchefstroom", Province::NorthWest),
    ("klerksdorp", Province::NorthWest),
];

/// Look up the province containing a town or suburb. Case-insensitive;
/// `None` when the town is not in the table.
pub fn province_for_town(town: &str) -> Option<Province> {
    let needle = town.trim().to_lowercase();
    TOWN_PROVINCES
        .iter()
        .find(|(name, _)| *name == needle)
        .map(|(_, province)| *province)
}
