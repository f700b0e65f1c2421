//! Derived views over the loaded tables. Nothing here is cached; every view
//! is recomputed from the borrowed datasets.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::error::{DataError, Result};
use super::model::{combined, EnvironmentData, EnvironmentRecord, GrowthData, GrowthRecord, SiteId};
use crate::config::SiteConfig;

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SiteSummary {
    pub site: SiteId,
    pub target_ec: f64,
    pub specimens: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalAverages {
    pub temperature: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteEnvMeans {
    pub site: SiteId,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub ec: f64,
    pub samples: usize,
}

/// A growth record paired with the target EC of its site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedGrowth<'a> {
    pub record: &'a GrowthRecord,
    pub target_ec: f64,
}

/// Mean fresh weight of every specimen grown at one target EC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EcGrowth {
    pub ec: f64,
    pub mean_fresh_weight: f64,
    pub specimens: usize,
}

/// Five-number summary of fresh weight at one site.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthSpread {
    pub site: SiteId,
    pub target_ec: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub time: NaiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub ec: f64,
}

/// Time series of one site plus its target-EC reference line.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSeries {
    pub site: SiteId,
    pub target_ec: f64,
    pub points: Vec<SeriesPoint>,
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

/// One row per configured site, in configuration order.
pub fn site_summaries(config: &SiteConfig, growth: &GrowthData) -> Vec<SiteSummary> {
    config
        .entries()
        .iter()
        .map(|(site, ec)| SiteSummary {
            site: site.clone(),
            target_ec: *ec,
            specimens: growth.get(site).map_or(0, Vec::len),
        })
        .collect()
}

pub fn total_specimens(growth: &GrowthData) -> usize {
    growth.values().map(Vec::len).sum()
}

/// Mean temperature and humidity over every site's records; `None` when
/// there are no records at all.
pub fn global_averages(env: &EnvironmentData) -> Option<GlobalAverages> {
    let (mut temperature, mut humidity, mut n) = (0.0, 0.0, 0usize);
    for r in combined(env) {
        temperature += r.temperature;
        humidity += r.humidity;
        n += 1;
    }
    (n > 0).then(|| GlobalAverages {
        temperature: temperature / n as f64,
        humidity: humidity / n as f64,
    })
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Column-wise means per site. Sites with an empty table are left out.
pub fn site_env_means(env: &EnvironmentData) -> Vec<SiteEnvMeans> {
    env.iter()
        .filter(|(_, table)| !table.is_empty())
        .map(|(site, table)| {
            let n = table.len() as f64;
            let mean = |f: fn(&EnvironmentRecord) -> f64| {
                table.iter().map(f).sum::<f64>() / n
            };
            SiteEnvMeans {
                site: site.clone(),
                temperature: mean(|r| r.temperature),
                humidity: mean(|r| r.humidity),
                ph: mean(|r| r.ph),
                ec: mean(|r| r.ec),
                samples: table.len(),
            }
        })
        .collect()
}

/// Time-ordered samples of `site` with its target EC.
pub fn site_series(config: &SiteConfig, env: &EnvironmentData, site: &SiteId) -> Result<SiteSeries> {
    let target_ec = config.target_ec(site)?;
    let table = env
        .get(site)
        .ok_or_else(|| DataError::UnknownSite(site.clone()))?;

    let mut points: Vec<SeriesPoint> = table
        .iter()
        .map(|r| SeriesPoint {
            time: r.time,
            temperature: r.temperature,
            humidity: r.humidity,
            ec: r.ec,
        })
        .collect();
    points.sort_by_key(|p| p.time);

    Ok(SiteSeries {
        site: site.clone(),
        target_ec,
        points,
    })
}

// ---------------------------------------------------------------------------
// Growth
// ---------------------------------------------------------------------------

/// Pair every growth record with its site's target EC. A site missing from
/// the configuration fails the whole join.
pub fn join_growth<'a>(config: &SiteConfig, growth: &'a GrowthData) -> Result<Vec<JoinedGrowth<'a>>> {
    join_records(config, combined(growth))
}

/// [`join_growth`] over an arbitrary selection of records.
pub fn join_records<'a>(
    config: &SiteConfig,
    records: impl IntoIterator<Item = &'a GrowthRecord>,
) -> Result<Vec<JoinedGrowth<'a>>> {
    records
        .into_iter()
        .map(|record| {
            Ok(JoinedGrowth {
                record,
                target_ec: config.target_ec(&record.site)?,
            })
        })
        .collect()
}

/// Mean fresh weight grouped by target EC, ascending by EC.
pub fn growth_by_ec(config: &SiteConfig, growth: &GrowthData) -> Result<Vec<EcGrowth>> {
    // f64 keys via their bit pattern; configured ECs are exact literals.
    let mut groups: BTreeMap<u64, (f64, f64, usize)> = BTreeMap::new();
    for row in join_growth(config, growth)? {
        let entry = groups
            .entry(row.target_ec.to_bits())
            .or_insert((row.target_ec, 0.0, 0));
        entry.1 += row.record.fresh_weight;
        entry.2 += 1;
    }

    let mut out: Vec<EcGrowth> = groups
        .into_values()
        .map(|(ec, sum, n)| EcGrowth {
            ec,
            mean_fresh_weight: sum / n as f64,
            specimens: n,
        })
        .collect();
    out.sort_by(|a, b| a.ec.total_cmp(&b.ec));
    Ok(out)
}

/// The EC group with the highest mean fresh weight. The first wins ties;
/// groups without a finite mean are never picked.
pub fn best_ec(groups: &[EcGrowth]) -> Option<&EcGrowth> {
    groups
        .iter()
        .filter(|g| g.mean_fresh_weight.is_finite())
        .fold(None, |best: Option<&EcGrowth>, g| match best {
            Some(b) if b.mean_fresh_weight.total_cmp(&g.mean_fresh_weight).is_ge() => Some(b),
            _ => Some(g),
        })
}

/// Box-plot statistics per configured site that has at least one specimen.
pub fn growth_spread(config: &SiteConfig, growth: &GrowthData) -> Vec<GrowthSpread> {
    config
        .entries()
        .iter()
        .filter_map(|(site, ec)| {
            let mut weights: Vec<f64> = growth.get(site)?.iter().map(|r| r.fresh_weight).collect();
            if weights.is_empty() {
                return None;
            }
            weights.sort_by(f64::total_cmp);
            Some(GrowthSpread {
                site: site.clone(),
                target_ec: *ec,
                min: weights[0],
                q1: quantile(&weights, 0.25),
                median: quantile(&weights, 0.5),
                q3: quantile(&weights, 0.75),
                max: weights[weights.len() - 1],
            })
        })
        .collect()
}

/// Linear-interpolation quantile of sorted, non-empty `values`.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_timestamp;

    fn growth(sites: &[(&str, &[f64])]) -> GrowthData {
        sites
            .iter()
            .map(|(name, weights)| {
                let site = SiteId::new(name);
                let records = weights
                    .iter()
                    .map(|w| GrowthRecord {
                        site: site.clone(),
                        fresh_weight: *w,
                        metrics: Vec::new(),
                    })
                    .collect();
                (site, records)
            })
            .collect()
    }

    fn env_record(site: &str, time: &str, temperature: f64, humidity: f64) -> EnvironmentRecord {
        EnvironmentRecord {
            time: parse_timestamp(time).unwrap(),
            temperature,
            humidity,
            ph: 6.0,
            ec: 1.5,
            site: SiteId::new(site),
        }
    }

    fn env(records: Vec<EnvironmentRecord>) -> EnvironmentData {
        let mut data = EnvironmentData::new();
        for r in records {
            data.entry(r.site.clone()).or_default().push(r);
        }
        data
    }

    #[test]
    fn best_ec_picks_highest_group_mean() {
        let config = SiteConfig::from_entries([("a", 1.0), ("b", 2.0), ("c", 4.0)]);
        let data = growth(&[("a", &[1.0, 2.0, 3.0]), ("b", &[5.0, 6.0, 7.0]), ("c", &[2.0, 2.0])]);

        let groups = growth_by_ec(&config, &data).unwrap();
        let means: Vec<(f64, f64)> = groups.iter().map(|g| (g.ec, g.mean_fresh_weight)).collect();
        assert_eq!(means, [(1.0, 2.0), (2.0, 6.0), (4.0, 2.0)]);

        let best = best_ec(&groups).unwrap();
        assert_eq!(best.ec, 2.0);
        assert_eq!(best.mean_fresh_weight, 6.0);
        assert!(best_ec(&[]).is_none());
    }

    #[test]
    fn best_ec_skips_groups_without_a_finite_mean() {
        let groups = [
            EcGrowth { ec: 2.0, mean_fresh_weight: 6.0, specimens: 3 },
            EcGrowth { ec: 8.0, mean_fresh_weight: f64::NAN, specimens: 1 },
            EcGrowth { ec: 4.0, mean_fresh_weight: 6.0, specimens: 2 },
        ];
        assert_eq!(best_ec(&groups).unwrap().ec, 2.0);

        let none = [EcGrowth { ec: 1.0, mean_fresh_weight: f64::NAN, specimens: 1 }];
        assert!(best_ec(&none).is_none());
    }

    #[test]
    fn sites_sharing_an_ec_are_grouped() {
        let config = SiteConfig::from_entries([("a", 1.0), ("b", 1.0)]);
        let data = growth(&[("a", &[1.0]), ("b", &[3.0])]);
        let groups = growth_by_ec(&config, &data).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].mean_fresh_weight, 2.0);
        assert_eq!(groups[0].specimens, 2);
    }

    #[test]
    fn join_uses_configured_ec_and_rejects_unknown_sites() {
        let config = SiteConfig::default();
        let data = growth(&[("송도고", &[1.0]), ("동산고", &[2.0, 3.0])]);
        for row in join_growth(&config, &data).unwrap() {
            assert_eq!(row.target_ec, config.target_ec(&row.record.site).unwrap());
        }

        let unknown = growth(&[("송도고", &[1.0]), ("없는고", &[2.0])]);
        assert!(matches!(
            join_growth(&config, &unknown),
            Err(DataError::UnknownSite(site)) if site.as_str() == "없는고"
        ));
        assert!(growth_by_ec(&config, &unknown).is_err());
    }

    #[test]
    fn summaries_follow_configuration_order() {
        let config = SiteConfig::default();
        let data = growth(&[("하늘고", &[1.0, 2.0])]);
        let summary = site_summaries(&config, &data);
        assert_eq!(summary.len(), 4);
        assert_eq!(summary[0].site.as_str(), "송도고");
        assert_eq!(summary[0].specimens, 0);
        assert_eq!(summary[1].specimens, 2);
        assert_eq!(summary[1].target_ec, 2.0);
        assert_eq!(total_specimens(&data), 2);
    }

    #[test]
    fn environment_means() {
        let data = env(vec![
            env_record("송도고", "2025-05-01 10:00", 20.0, 50.0),
            env_record("송도고", "2025-05-01 11:00", 22.0, 70.0),
            env_record("하늘고", "2025-05-01 10:00", 30.0, 30.0),
        ]);

        let global = global_averages(&data).unwrap();
        assert_eq!(global.temperature, 24.0);
        assert_eq!(global.humidity, 50.0);
        assert!(global_averages(&EnvironmentData::new()).is_none());

        let per_site = site_env_means(&data);
        assert_eq!(per_site.len(), 2);
        assert_eq!(per_site[0].site.as_str(), "송도고");
        assert_eq!(per_site[0].temperature, 21.0);
        assert_eq!(per_site[0].humidity, 60.0);
        assert_eq!(per_site[0].samples, 2);
    }

    #[test]
    fn series_is_time_ordered_with_target_line() {
        let config = SiteConfig::default();
        let data = env(vec![
            env_record("아라고", "2025-05-02 10:00", 2.0, 0.0),
            env_record("아라고", "2025-05-01 10:00", 1.0, 0.0),
        ]);
        let series = site_series(&config, &data, &SiteId::new("아라고")).unwrap();
        assert_eq!(series.target_ec, 4.0);
        let temps: Vec<f64> = series.points.iter().map(|p| p.temperature).collect();
        assert_eq!(temps, [1.0, 2.0]);
    }

    #[test]
    fn series_for_missing_site_is_not_found() {
        let config = SiteConfig::default();
        let data = env(vec![env_record("아라고", "2025-05-01", 1.0, 0.0)]);
        assert!(matches!(
            site_series(&config, &data, &SiteId::new("동산고")),
            Err(DataError::UnknownSite(_))
        ));
        assert!(matches!(
            site_series(&config, &data, &SiteId::new("없는고")),
            Err(DataError::UnknownSite(_))
        ));
    }

    #[test]
    fn spread_quartiles() {
        let config = SiteConfig::from_entries([("a", 1.0), ("b", 2.0)]);
        let data = growth(&[("a", &[4.0, 1.0, 3.0, 2.0, 5.0])]);
        let spread = growth_spread(&config, &data);
        assert_eq!(spread.len(), 1);
        let s = &spread[0];
        assert_eq!((s.min, s.q1, s.median, s.q3, s.max), (1.0, 2.0, 3.0, 4.0, 5.0));
    }
}
