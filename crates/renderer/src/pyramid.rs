//! Tier selection for the synthetic pyramid layer.

use projection::scale_for_zoom;
use storage::{Catalog, GeoTiff, TierTable};
use tracing::debug;
use wms_common::BoundingBox;

/// True when one entry's interior alone covers at least `coverage` of `target`.
pub fn covers(entries: &[GeoTiff], target: &BoundingBox, coverage: f64) -> bool {
    let needed = target.area() * coverage;
    entries.iter().any(|entry| {
        entry
            .interior
            .and_then(|interior| interior.intersection(target))
            .is_some_and(|common| common.area() >= needed)
    })
}

/// Catalog layers to draw for the pyramid at `zoom`, coarsest first.
///
/// Every tier from the coarsest down to the one fit for the zoom level is
/// considered. A tier with nothing in the target box is left out; a tier
/// that covers the box on its own makes every coarser tier already picked
/// invisible, so those are dropped.
pub fn select_layers(
    catalog: &Catalog,
    tiers: &TierTable,
    target: &BoundingBox,
    zoom: f64,
    coverage: f64,
) -> Vec<String> {
    let Some(finest) = tiers.for_scale(scale_for_zoom(zoom)) else {
        return Vec::new();
    };

    let mut selected: Vec<String> = Vec::new();
    for tier in tiers.coarse_to(finest) {
        let layer = tier.layer_name();
        let Some(entries) = catalog.layer(&layer) else {
            continue;
        };
        let visible = entries
            .iter()
            .any(|e| e.interior.is_some_and(|i| i.intersects(target)));
        if !visible {
            continue;
        }
        if covers(entries, target, coverage) && !selected.is_empty() {
            debug!(layer = %layer, dropped = ?selected, "Tier covers the box, dropping coarser tiers");
            selected.clear();
        }
        selected.push(layer);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection::{project, Projection};
    use storage::CatalogDocument;
    use test_utils::fixtures::SAMPLE_CATALOG;

    fn catalog() -> Catalog {
        Catalog::from_document(&CatalogDocument::from_yaml(SAMPLE_CATALOG).unwrap(), 400)
    }

    fn world(west: f64, south: f64, east: f64, north: f64) -> BoundingBox {
        project(&BoundingBox::new(west, south, east, north), Projection::WorldMercator).unwrap()
    }

    #[test]
    fn test_small_box_inside_50k_drops_overview() {
        let layers = select_layers(
            &catalog(),
            &TierTable::default(),
            &world(-4.9, 48.1, -4.8, 48.2),
            13.0,
            0.99,
        );
        assert_eq!(layers, vec!["gt50k".to_string()]);
    }

    #[test]
    fn test_low_zoom_stops_at_coarse_tiers() {
        let layers = select_layers(
            &catalog(),
            &TierTable::default(),
            &world(-4.9, 48.1, -4.8, 48.2),
            3.0,
            0.99,
        );
        assert_eq!(layers, vec!["gt40M".to_string()]);
    }

    #[test]
    fn test_partial_cover_keeps_coarser_tier() {
        // box straddles the western edge of the 50k charts
        let layers = select_layers(
            &catalog(),
            &TierTable::default(),
            &world(-5.2, 48.1, -4.9, 48.3),
            13.0,
            0.99,
        );
        assert_eq!(layers, vec!["gt40M".to_string(), "gt50k".to_string()]);
    }
}
