//! Common test fixtures: catalog documents and reference areas.

/// Common geographic boxes (west, south, east, north) in degrees.
pub mod bbox {
    /// Rade de Brest and approaches
    pub const BREST: (f64, f64, f64, f64) = (-4.8, 48.2, -4.3, 48.5);

    /// Western Channel
    pub const WESTERN_CHANNEL: (f64, f64, f64, f64) = (-6.0, 48.0, -2.0, 50.5);

    /// Across longitude 180° (Wallis and Futuna area)
    pub const ANTIMERIDIAN: (f64, f64, f64, f64) = (175.0, -16.0, -178.0, -12.0);

    /// Latitude beyond any projection's range
    pub const OUT_OF_RANGE: (f64, f64, f64, f64) = (-5.0, 47.0, -4.0, 95.0);
}

/// Small catalog covering the situations the loader must handle:
/// - two overlapping 50k charts, the first forced above the second by `drawAfter`
/// - a chart with negative right/bottom margins
/// - a chart without an exterior box (cartouche-only)
/// - a chart crossing the antimeridian
/// - a special AEM chart and a 40M overview
/// - degree/minute erasure zones
pub const SAMPLE_CATALOG: &str = r#"
drawAfter:
  - { below: "7002_pal300", above: "7001_pal300" }
layers:
  gt50k:
    - name: 7001_pal300
      title: "De la Pointe de Penmarc'h a l'Ile d'Ouessant"
      scaleDenominator: 50000
      edition: "Edition n 4 - 2019"
      lastUpdate: "2023-05-11"
      width: 200
      height: 200
      south: 48.0
      west: -5.0
      north: 48.5
      east: -4.5
      left: 10
      bottom: -10
      right: -10
      top: 10
    - name: 7002_pal300
      title: "Rade de Brest"
      scaleDenominator: 48000
      edition: "Edition n 2 - 2017"
      lastUpdate: "2022-11-02"
      width: 200
      height: 200
      south: 48.2
      west: -4.8
      north: 48.7
      east: -4.3
      left: 10
      bottom: 190
      right: 190
      top: 10
      erasures:
        - rect: { SW: "48°40.00'N - 4°20.00'W", NE: [-4.3, 48.7] }
        - polygon: [[-4.8, 48.2], [-4.7, 48.2], [-4.8, 48.3]]
    - name: 7003_pal300
      title: "Cartouche sans zone principale"
      scaleDenominator: 50000
      edition: "Edition n 1 - 2001"
      lastUpdate: "2001-01-01"
      width: 100
      height: 100
      left: 0
      bottom: 100
      right: 100
      top: 0
  gt1M:
    - name: 6977_pal300
      title: "Iles Wallis et Futuna"
      scaleDenominator: 1000000
      edition: "Edition n 1 - 2010"
      lastUpdate: "2020-02-02"
      zorder: 1
      width: 100
      height: 100
      south: -16.0
      west: 175.0
      north: -12.0
      east: -178.0
      left: 0
      bottom: 100
      right: 100
      top: 0
  gtaem:
    - name: 7330_pal300
      title: "De Cherbourg a Barfleur - action de l'Etat en mer"
      scaleDenominator: 50000
      edition: "Edition n 3 - 2015"
      lastUpdate: "2021-03-04"
      width: 100
      height: 100
      south: 49.5
      west: -1.9
      north: 49.8
      east: -1.2
      left: 5
      bottom: 95
      right: 95
      top: 5
  gt40M:
    - name: 0101_pal300
      title: "Planisphere"
      scaleDenominator: 40000000
      edition: "Edition n 1 - 2000"
      lastUpdate: "2000-01-01"
      width: 360
      height: 160
      south: -80.0
      west: -180.0
      north: 80.0
      east: 180.0
      left: 0
      bottom: 160
      right: 360
      top: 0
"#;

/// Chart index consumed by the catalog builder: a flat list of charts with
/// no layer assignment yet.
pub const SAMPLE_INDEX: &str = r#"
drawAfter:
  - { below: "7042_pal300", above: "6680_pal300" }
charts:
  - name: 7042_pal300
    title: "Golfe du Morbihan"
    scaleDenominator: 12345
    edition: "Edition n 5 - 2020"
    lastUpdate: "2023-01-01"
    width: 100
    height: 100
    south: 47.5
    west: -3.0
    north: 47.7
    east: -2.7
    left: 0
    bottom: 100
    right: 100
    top: 0
  - name: 6680_pal300
    title: "Baie de Quiberon"
    scaleDenominator: 20000
    edition: "Edition n 2 - 2011"
    lastUpdate: "2021-01-01"
    width: 100
    height: 100
    south: 47.4
    west: -3.2
    north: 47.7
    east: -2.8
    left: 0
    bottom: 100
    right: 100
    top: 0
  - name: 7330_pal300
    title: "De Cherbourg a Barfleur - action de l'Etat en mer"
    scaleDenominator: 50000
    edition: "Edition n 3 - 2015"
    lastUpdate: "2021-03-04"
    width: 100
    height: 100
    south: 49.5
    west: -1.9
    north: 49.8
    east: -1.2
    left: 0
    bottom: 100
    right: 100
    top: 0
"#;
