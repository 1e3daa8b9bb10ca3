//! Scale tiers, special-chart layers and draw-order fix-ups.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::document::DrawAfter;

/// Name of the synthetic multi-tier layer.
pub const PYRAMID_LAYER: &str = "gtpyr";

/// Prefix of label layers (`num50k` labels the charts of `gt50k`).
pub const LABEL_PREFIX: &str = "num";

/// One scale bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Tier {
    /// Short name, `50k`; the layer is `gt50k`.
    pub name: String,
    /// Nominal scale denominator, also the largest chart denominator the
    /// tier accepts.
    pub nominal: f64,
}

impl Tier {
    fn new(name: &str, nominal: f64) -> Self {
        Self {
            name: name.to_string(),
            nominal,
        }
    }

    pub fn layer_name(&self) -> String {
        format!("gt{}", self.name)
    }
}

/// Ordered table of tiers, finest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierTable {
    pub tiers: Vec<Tier>,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            tiers: vec![
                Tier::new("5k", 5e3),
                Tier::new("12k", 12e3),
                Tier::new("25k", 25e3),
                Tier::new("50k", 50e3),
                Tier::new("100k", 100e3),
                Tier::new("250k", 250e3),
                Tier::new("500k", 500e3),
                Tier::new("1M", 1e6),
                Tier::new("2M", 2e6),
                Tier::new("4M", 4e6),
                Tier::new("10M", 10e6),
                Tier::new("40M", 40e6),
            ],
        }
    }
}

impl TierTable {
    /// Tier of a chart from its scale denominator.
    ///
    /// First tier whose nominal denominator is at least the chart's, so a
    /// chart is never filed under a finer scale than its own: 1:12 345 goes
    /// to `25k`, 1:52 000 to `100k`. Charts coarser than every tier land in
    /// the last one.
    pub fn assign(&self, scale_denominator: f64) -> Option<&Tier> {
        self.tiers
            .iter()
            .find(|t| scale_denominator <= t.nominal)
            .or_else(|| self.tiers.last())
    }

    pub fn by_layer(&self, layer: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.layer_name() == layer)
    }

    /// Finest tier fit for drawing at `scale_denominator`: its nominal scale
    /// may be at most twice finer than the requested one.
    pub fn for_scale(&self, scale_denominator: f64) -> Option<&Tier> {
        self.tiers
            .iter()
            .find(|t| t.nominal >= scale_denominator / 2.0)
            .or_else(|| self.tiers.last())
    }

    /// Tiers from the coarsest down to `finest` inclusive.
    pub fn coarse_to(&self, finest: &Tier) -> Vec<&Tier> {
        self.tiers
            .iter()
            .rev()
            .take_while(|t| t.nominal >= finest.nominal)
            .collect()
    }

    pub fn coarsest(&self) -> Option<&Tier> {
        self.tiers.last()
    }
}

/// Charts pinned to dedicated layers regardless of scale, by chart number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialCharts {
    /// Action de l'Etat en mer charts.
    pub aem: Vec<String>,
    /// Cross-Channel grid chart.
    pub manche_grid: Vec<String>,
    /// Maritime zones chart.
    pub zon_mar: Vec<String>,
}

impl Default for SpecialCharts {
    fn default() -> Self {
        let list = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        Self {
            aem: list(&["7330", "7344", "7360", "8502", "8509", "8517", "8523"]),
            manche_grid: list(&["8101"]),
            zon_mar: list(&["8510"]),
        }
    }
}

impl SpecialCharts {
    pub const LAYERS: [&'static str; 3] = ["gtaem", "gtMancheGrid", "gtZonMar"];

    /// Dedicated layer of a chart, looked up by the number before `_`.
    pub fn layer_for(&self, chart_name: &str) -> Option<&'static str> {
        let number = chart_name.split('_').next().unwrap_or(chart_name);
        let hit = |list: &[String]| list.iter().any(|n| n == number);
        if hit(&self.aem) {
            Some("gtaem")
        } else if hit(&self.manche_grid) {
            Some("gtMancheGrid")
        } else if hit(&self.zon_mar) {
            Some("gtZonMar")
        } else {
            None
        }
    }
}

/// Reorder `items` so that for every constraint the `above` item comes after
/// the `below` item.
///
/// Each violated pair is fixed by moving `above` to immediately follow
/// `below`; everything else keeps its relative order. Passes repeat until
/// nothing moves, so an already consistent order comes back unchanged.
/// Constraints naming absent items are ignored. Cyclic constraints cannot be
/// satisfied; after a bounded number of passes the current order is kept.
pub fn reorder<T, F>(items: Vec<T>, constraints: &[DrawAfter], key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    // positions of item indices; `order[p]` is the item drawn at p
    let mut order: Vec<usize> = (0..items.len()).collect();
    let first_index: HashMap<&str, usize> = items
        .iter()
        .enumerate()
        .rev()
        .map(|(i, item)| (key(item), i))
        .collect();

    let pairs: Vec<(usize, usize)> = constraints
        .iter()
        .filter_map(|c| {
            Some((
                *first_index.get(c.below.as_str())?,
                *first_index.get(c.above.as_str())?,
            ))
        })
        .filter(|(below, above)| below != above)
        .collect();

    let max_passes = pairs.len() + 1;
    let mut settled = pairs.is_empty();
    for _ in 0..max_passes {
        if settled {
            break;
        }
        settled = true;
        for &(below, above) in &pairs {
            let mut position = vec![0usize; items.len()];
            for (p, &i) in order.iter().enumerate() {
                position[i] = p;
            }
            let (pb, pa) = (position[below], position[above]);
            if pa < pb {
                order.remove(pa);
                // `below` shifted left by one
                order.insert(pb, above);
                settled = false;
            }
        }
    }
    if !settled {
        warn!(constraints = pairs.len(), "Draw-after constraints are cyclic, order left partially applied");
    }

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}
