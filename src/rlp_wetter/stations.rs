// rlp_wetter - Sensor exporter for the RLP agrometeorology network
//
// Copyright 2026 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

//! Directory of weather stations in the agrometeorology network.

use serde::Serialize;

/// A fixed physical measurement site, identified by the numeric ID used as `sid` by the API.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Station {
    pub name: &'static str,
    pub id: u32,
}

const fn station(name: &'static str, id: u32) -> Station {
    Station { name, id }
}

/// All stations known to this build, in no particular order.
///
/// The IDs are placeholders. Stations missing from this table can still be configured and
/// are titled `Station <id>`.
// TODO: Replace the IDs with the `sid` values from the station listing on wetter.rlp.de.
pub static STATIONS: &[Station] = &[
    station("Alzey", 102),
    station("Bad Dürkheim", 105),
    station("Bad Kreuznach", 108),
    station("Bernkastel-Kues", 111),
    station("Bingen-Büdesheim", 114),
    station("Bitburg", 117),
    station("Dienheim", 120),
    station("Edenkoben", 123),
    station("Ellerstadt", 126),
    station("Gau-Algesheim", 129),
    station("Hahnheim", 132),
    station("Ingelheim", 135),
    station("Kirrweiler", 138),
    station("Klingenmünster", 141),
    station("Landau-Nußdorf", 144),
    station("Mainz-Hechtsheim", 147),
    station("Mertesdorf", 150),
    station("Neustadt-Mußbach", 153),
    station("Nierstein", 156),
    station("Oppenheim", 159),
    station("Schweich", 162),
    station("Trier-Petrisberg", 165),
    station("Westhofen", 168),
    station("Worms", 171),
    station("Zornheim", 174),
];

/// Find a station by ID.
pub fn lookup(id: u32) -> Option<&'static Station> {
    STATIONS.iter().find(|s| s.id == id)
}

/// Return true if the station ID is part of the directory.
pub fn contains(id: u32) -> bool {
    lookup(id).is_some()
}

/// Display title for a station: its directory name, or a generic name built from the ID.
pub fn title_for(id: u32) -> String {
    match lookup(id) {
        Some(s) => s.name.to_owned(),
        None => format!("Station {}", id),
    }
}

/// Stations sorted alphabetically by name, as offered when picking a station to configure.
pub fn picker() -> Vec<&'static Station> {
    let mut out: Vec<&'static Station> = STATIONS.iter().collect();
    out.sort_by(|a, b| a.name.cmp(b.name));
    out
}

#[cfg(test)]
mod test {
    use super::{contains, lookup, picker, title_for, STATIONS};
    use std::collections::HashSet;

    #[test]
    fn test_station_ids_unique() {
        let ids: HashSet<u32> = STATIONS.iter().map(|s| s.id).collect();
        assert_eq!(STATIONS.len(), ids.len());
    }

    #[test]
    fn test_lookup_known() {
        let s = lookup(102).unwrap();
        assert_eq!("Alzey", s.name);
        assert!(contains(102));
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(lookup(1).is_none());
        assert!(!contains(1));
    }

    #[test]
    fn test_title_for_known_station() {
        assert_eq!("Worms", title_for(171));
    }

    #[test]
    fn test_title_for_unknown_station() {
        assert_eq!("Station 9999", title_for(9999));
    }

    #[test]
    fn test_picker_sorted_by_name() {
        let names: Vec<&str> = picker().iter().map(|s| s.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, names);
        assert_eq!(STATIONS.len(), names.len());
    }
}
