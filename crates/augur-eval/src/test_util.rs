//! Sample fixtures shared by the unit tests.

use augur_traits::{Date, EvaluationSample, ForwardReturn, RatingLabel};

pub(crate) const HORIZON: usize = 21;

pub(crate) fn day(n: u64) -> Date {
    Date::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Days::new(n)
}

/// Builds a sample executing the day after `date` with the given returns.
pub(crate) fn build(
    ticker: &str,
    date: Date,
    human: Option<RatingLabel>,
    sector: Option<&str>,
    ai: Option<(RatingLabel, f64)>,
    returns: &[(usize, Option<f64>)],
) -> EvaluationSample {
    let exec = date.succ_opt().unwrap();
    let mut builder = EvaluationSample::builder(ticker, date)
        .human_rating(human)
        .sector(sector.map(str::to_string))
        .execution_date(Some(exec));
    for &(horizon, value) in returns {
        let record = value.map(|value| ForwardReturn {
            horizon,
            entry_date: exec,
            exit_date: exec + chrono::Days::new(horizon as u64),
            value,
        });
        builder = builder.forward_return(horizon, record);
    }
    let sample = builder.build().unwrap();
    match ai {
        Some((rating, signal)) => sample.with_signal(rating, 1.0, signal),
        None => sample,
    }
}

/// Hold-rated sample with an optional signal and a 21-day return.
pub(crate) fn sample(ticker: &str, date: Date, signal: Option<f64>, ret: Option<f64>) -> EvaluationSample {
    build(
        ticker,
        date,
        Some(RatingLabel::Hold),
        None,
        signal.map(|s| (RatingLabel::Hold, s)),
        &[(HORIZON, ret)],
    )
}

/// Sample whose AI signal is the base score of `ai`.
pub(crate) fn rated(
    ticker: &str,
    date: Date,
    human: Option<RatingLabel>,
    ai: RatingLabel,
    ret: Option<f64>,
) -> EvaluationSample {
    build(ticker, date, human, None, Some((ai, ai.base_score())), &[(HORIZON, ret)])
}
