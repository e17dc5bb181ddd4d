//! Real Warsaw locations for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap.

use courier_route::Coordinate;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub address: &'static str,
    pub lon: f64,
    pub lat: f64,
}

impl Location {
    pub const fn new(name: &'static str, address: &'static str, lon: f64, lat: f64) -> Self {
        Self {
            name,
            address,
            lon,
            lat,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lon, self.lat)
    }
}

/// Depot at Warszawa Centralna.
pub const DEPOT: Location = Location::new(
    "Warszawa Centralna",
    "Aleje Jerozolimskie 54, Warszawa",
    21.0031,
    52.2289,
);

pub const DELIVERIES: &[Location] = &[
    Location::new("Palace of Culture", "plac Defilad 1, Warszawa", 21.0067, 52.2319),
    Location::new("Old Town Market Square", "Rynek Starego Miasta 1, Warszawa", 21.0122, 52.2497),
    Location::new("Łazienki Palace", "Agrykoli 1, Warszawa", 21.0353, 52.2150),
    Location::new("Wilanów Palace", "Stanisława Kostki Potockiego 10, Warszawa", 21.0905, 52.1650),
    Location::new("Koneser", "Ząbkowska 27, Warszawa", 21.0436, 52.2552),
    Location::new("Warsaw Rising Museum", "Grzybowska 79, Warszawa", 20.9810, 52.2324),
    Location::new("National Stadium", "aleja Księcia Józefa Poniatowskiego 1, Warszawa", 21.0456, 52.2395),
    Location::new("Copernicus Science Centre", "Wybrzeże Kościuszkowskie 20, Warszawa", 21.0287, 52.2419),
    Location::new("Galeria Mokotów", "Wołoska 12, Warszawa", 21.0030, 52.1800),
];

/// Origin with four destinations around it, listed N, S, E, W so the input
/// order zig-zags across the origin.
pub fn loop_around_origin() -> (Coordinate, Vec<Coordinate>) {
    let origin = Coordinate::new(21.0, 52.2);
    let destinations = vec![
        Coordinate::new(21.0, 52.22),
        Coordinate::new(21.0, 52.18),
        Coordinate::new(21.03, 52.2),
        Coordinate::new(20.97, 52.2),
    ];
    (origin, destinations)
}
