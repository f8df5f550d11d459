use std::{collections::BTreeMap, path::PathBuf};

use breakcue_analysis::TrendAnalyzer;
use breakcue_profile::{SmoothingMethod, TrendMetric};
use breakcue_stats::{anomaly::DEFAULT_Z_THRESHOLD, descriptive::DescriptiveStats};
use serde::Serialize;

use crate::util;

use super::AppContext;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PlayerArg {
    /// Player identifier
    #[arg(long)]
    player: String,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RecordArg {
    #[clap(flatten)]
    target: PlayerArg,
    /// JSON file holding one game record
    #[arg(long)]
    game: PathBuf,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AnalyzeArg {
    #[clap(flatten)]
    target: PlayerArg,
    /// Moving-average window (overrides the configuration file)
    #[arg(long)]
    window: Option<usize>,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SmoothArg {
    #[clap(flatten)]
    target: PlayerArg,
    /// Moving-average window (overrides the configuration file)
    #[arg(long)]
    window: Option<usize>,
    /// Smoothing method: simple or ewma
    #[arg(long, default_value = "simple")]
    method: SmoothingMethod,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AnomaliesArg {
    #[clap(flatten)]
    target: PlayerArg,
    /// Trend series to inspect
    #[arg(long, default_value = "accuracy")]
    metric: TrendMetric,
    /// Z-score above which a game is reported
    #[arg(long, default_value_t = DEFAULT_Z_THRESHOLD)]
    threshold: f64,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RecentArg {
    #[clap(flatten)]
    target: PlayerArg,
    /// Number of games to show
    #[arg(long, default_value_t = 10)]
    count: usize,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SummaryArg {
    #[clap(flatten)]
    target: PlayerArg,
    /// Trend series to summarize; all of them when omitted
    #[arg(long)]
    metric: Option<TrendMetric>,
}

#[derive(Debug, Clone, Serialize)]
struct AnomalyReport {
    player_id: String,
    metric: TrendMetric,
    threshold: f64,
    indices: Vec<usize>,
}

/// Serializable form of [`DescriptiveStats`].
#[derive(Debug, Clone, Serialize)]
struct MetricSummary {
    count: usize,
    min: f64,
    max: f64,
    mean: f64,
    median: f64,
    variance: f64,
    std_dev: f64,
    sample_variance: f64,
    sample_std_dev: f64,
}

impl From<DescriptiveStats> for MetricSummary {
    fn from(stats: DescriptiveStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean,
            median: stats.median,
            variance: stats.variance,
            std_dev: stats.std_dev,
            sample_variance: stats.sample_variance,
            sample_std_dev: stats.sample_std_dev,
        }
    }
}

pub(crate) fn run_record(ctx: &AppContext, arg: &RecordArg) -> anyhow::Result<()> {
    let RecordArg { target, game } = arg;
    let game = util::read_game_record_file(game)?;
    let mut profile = ctx.open_profile(&target.player)?;
    profile.record_game(&game)?;

    let data = profile.data();
    eprintln!("Recorded game #{} for {}", data.games_played, data.player_id);
    eprintln!("  Win rate:     {:.3}", data.win_rate);
    eprintln!("  Win streak:   {}", data.consecutive_wins);
    eprintln!("  Avg accuracy: {:.3}", data.average_accuracy);
    util::save_json(data, target.output.as_deref())
}

pub(crate) fn run_analyze(ctx: &AppContext, arg: &AnalyzeArg) -> anyhow::Result<()> {
    let AnalyzeArg { target, window } = arg;
    let profile = ctx.open_profile(&target.player)?;
    let analyzer = TrendAnalyzer::new(window.unwrap_or(ctx.config.trend_window));
    let report = analyzer.analyze(profile.data());
    util::save_json(&report, target.output.as_deref())
}

pub(crate) fn run_smooth(ctx: &AppContext, arg: &SmoothArg) -> anyhow::Result<()> {
    let SmoothArg {
        target,
        window,
        method,
    } = arg;
    let profile = ctx.open_profile(&target.player)?;
    let trends =
        profile.get_smoothed_trends(window.unwrap_or(ctx.config.trend_window), *method);
    util::save_json(&trends, target.output.as_deref())
}

pub(crate) fn run_anomalies(ctx: &AppContext, arg: &AnomaliesArg) -> anyhow::Result<()> {
    let AnomaliesArg {
        target,
        metric,
        threshold,
    } = arg;
    let profile = ctx.open_profile(&target.player)?;
    let report = AnomalyReport {
        player_id: target.player.clone(),
        metric: *metric,
        threshold: *threshold,
        indices: profile.detect_anomalies(*threshold, *metric),
    };
    eprintln!(
        "{} anomalous games in {metric} for {}",
        report.indices.len(),
        report.player_id
    );
    util::save_json(&report, target.output.as_deref())
}

pub(crate) fn run_recent(ctx: &AppContext, arg: &RecentArg) -> anyhow::Result<()> {
    let RecentArg { target, count } = arg;
    let profile = ctx.open_profile(&target.player)?;
    util::save_json(
        profile.get_recent_performance(*count),
        target.output.as_deref(),
    )
}

pub(crate) fn run_summary(ctx: &AppContext, arg: &SummaryArg) -> anyhow::Result<()> {
    let SummaryArg { target, metric } = arg;
    let profile = ctx.open_profile(&target.player)?;
    let metrics = match metric {
        Some(metric) => vec![*metric],
        None => TrendMetric::ALL.to_vec(),
    };
    let summaries: BTreeMap<TrendMetric, Option<MetricSummary>> = metrics
        .into_iter()
        .map(|metric| (metric, profile.metric_summary(metric).map(MetricSummary::from)))
        .collect();
    util::save_json(&summaries, target.output.as_deref())
}
