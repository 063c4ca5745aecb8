//! End-to-end evaluation run.
//!
//! Universe → signals → statistics and backtest → analysis → artifacts. The
//! stages run sequentially; only signal generation touches the network.

use std::path::PathBuf;

use augur_eval::{
    ArtifactWriter, Backtest, BacktestResult, CoverageCounts, EvaluationSummary, FailedKey, IcObservation,
    SignalColumn, by_regime, by_sector, by_year, compute_decay, compute_ic_series, consensus_breakdown, holdout_report,
    periods_per_year, summarize_ic,
};
use augur_signals::{GenerationOutcome, SignalGenerator, SignalRepository};
use augur_traits::{Dataset, EvaluationSample, RatingProvider, Result};
use augur_universe::UniverseBuilder;
use tracing::{info, warn};

use crate::config::RunConfig;

/// Everything an evaluation run produced.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// Summary record, as written to `summary.json`.
    pub summary: EvaluationSummary,
    /// IC per decision date at the primary horizon.
    pub ic_series: Vec<IcObservation>,
    /// Backtest states and metrics.
    pub backtest: BacktestResult,
    /// Evaluated samples with their signals.
    pub samples: Vec<EvaluationSample>,
    /// Artifact files written, empty until [`EvaluationReport::write`] runs.
    pub artifacts: Vec<PathBuf>,
}

impl EvaluationReport {
    /// Writes every artifact into the writer's directory.
    pub fn write(&mut self, writer: &ArtifactWriter, horizons: &[usize]) -> Result<()> {
        self.artifacts = vec![
            writer.write_ic_series(&self.ic_series)?,
            writer.write_decay(&self.summary.decay)?,
            writer.write_backtest(&self.backtest.states)?,
            writer.write_universe(&self.samples, horizons)?,
            writer.write_summary(&self.summary)?,
        ];
        Ok(())
    }
}

/// Computes statistics, the backtest and the breakdowns for `samples`.
///
/// Coverage counts only reflect the samples; signal-generation counts are
/// left at zero.
pub fn evaluate(config: &RunConfig, samples: Vec<EvaluationSample>) -> Result<EvaluationReport> {
    let mut config = config.clone();
    config.validate()?;

    let horizon = config.primary_horizon;
    let min_cs = config.min_cross_section;
    let lags = config.newey_west_lags;
    let ppy = periods_per_year(horizon);
    let backtest_config = config.backtest_config();

    let ic_series = compute_ic_series(&samples, SignalColumn::AiSignal, horizon, min_cs);
    let ic = summarize_ic(&ic_series, horizon, lags);
    let human_series = compute_ic_series(&samples, SignalColumn::HumanScore, horizon, min_cs);
    let human_ic = summarize_ic(&human_series, horizon, lags);
    info!(
        dates = ic_series.len(),
        n_obs = ic.n_obs,
        mean_ic = ?ic.mean_ic,
        t_stat = ?ic.t_stat,
        nw_t_stat = ?ic.nw_t_stat,
        "computed IC"
    );

    let decay = compute_decay(&samples, SignalColumn::AiSignal, &config.horizons, min_cs, lags);
    let backtest = Backtest::new(backtest_config.clone()).run(&samples, SignalColumn::AiSignal, ppy)?;
    let holdout = holdout_report(
        &samples,
        config.holdout_start,
        SignalColumn::AiSignal,
        &backtest_config,
        min_cs,
        lags,
        ppy,
    )?;

    let summary = EvaluationSummary {
        primary_horizon: horizon,
        cost_per_side_bps: config.cost_per_side_bps,
        ic,
        human_ic,
        decay,
        performance: backtest.metrics,
        gross_performance: backtest.gross_metrics,
        avg_turnover: backtest.avg_turnover,
        total_transaction_costs: backtest.total_transaction_costs,
        coverage: CoverageCounts::from_samples(&samples, horizon),
        consensus: consensus_breakdown(&samples, horizon, min_cs, lags),
        by_year: by_year(&ic_series, horizon, lags),
        by_regime: by_regime(&ic_series, &config.regimes, horizon, lags),
        by_sector: by_sector(&samples, SignalColumn::AiSignal, horizon, min_cs, lags),
        holdout,
        data_gaps: Vec::new(),
        failed_keys: Vec::new(),
    };

    Ok(EvaluationReport {
        summary,
        ic_series,
        backtest,
        samples,
        artifacts: Vec::new(),
    })
}

/// Runs a full evaluation and writes its artifacts into `config.output_dir`.
///
/// Tickers without data and keys the provider failed on are reported in the
/// summary; neither aborts the run. A corrupt signal cache does.
pub async fn run_evaluation<P, R>(
    config: &RunConfig,
    dataset: &dyn Dataset,
    provider: P,
    repository: R,
) -> Result<EvaluationReport>
where
    P: RatingProvider,
    R: SignalRepository,
{
    let mut config = config.clone();
    config.validate()?;

    let mut universe = UniverseBuilder::new(dataset, config.universe_config()?)?.build()?;
    if let Some(max) = config.max_samples {
        universe = universe.downsample(max, config.allocation);
    }
    let data_gaps: Vec<String> = universe.gaps.iter().map(|g| g.ticker.clone()).collect();

    let mut generator = SignalGenerator::new(provider, repository, config.generator_config());
    let GenerationOutcome {
        samples,
        reused,
        generated,
        failures,
        ..
    } = generator.generate(universe.samples).await?;

    for failure in &failures {
        warn!(key = %failure.key, error = %failure.error, "no signal for key");
    }
    let failed_keys: Vec<FailedKey> = failures
        .into_iter()
        .map(|f| FailedKey {
            ticker: f.key.ticker,
            as_of_date: f.key.as_of_date,
            error: f.error.to_string(),
        })
        .collect();

    let mut report = evaluate(&config, samples)?;
    let coverage = &mut report.summary.coverage;
    coverage.data_gap_tickers = data_gaps.len();
    coverage.failed_keys = failed_keys.len();
    coverage.reused_signals = reused;
    coverage.generated_signals = generated;
    report.summary.data_gaps = data_gaps;
    report.summary.failed_keys = failed_keys;

    let writer = ArtifactWriter::new(&config.output_dir);
    report.write(&writer, &config.horizons)?;

    let coverage = report.summary.coverage;
    info!(
        samples = coverage.total_samples,
        usable = coverage.usable,
        reused = coverage.reused_signals,
        generated = coverage.generated_signals,
        failed = coverage.failed_keys,
        output_dir = %config.output_dir.display(),
        "evaluation finished"
    );
    Ok(report)
}
