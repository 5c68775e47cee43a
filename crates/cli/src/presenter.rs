//! Text output for analysis results

use nightlight_analysis::correlation::CorrelationResult;
use nightlight_analysis::country::CountryActivity;
use nightlight_analysis::reduce::Statistic;
use nightlight_analysis::time_series::TimeSeries;
use std::io::{self, Write};

/// Renders analysis results for the user
pub trait Presenter {
    fn show_statistic(&mut self, title: &str, statistic: &Statistic) -> io::Result<()>;
    fn show_correlation(&mut self, title: &str, result: &CorrelationResult) -> io::Result<()>;
    fn show_series(&mut self, series: &TimeSeries) -> io::Result<()>;
    fn show_activity(&mut self, activity: &[CountryActivity]) -> io::Result<()>;
}

/// Plain-text presenter writing to any `Write`
pub struct ConsolePresenter<W: Write> {
    out: W,
}

impl ConsolePresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn show_statistic(&mut self, title: &str, statistic: &Statistic) -> io::Result<()> {
        writeln!(self.out, "{}", title)?;
        writeln!(self.out, "  Total light: {:.2}", statistic.sum)?;
        writeln!(self.out, "  Average light: {:.2}", statistic.mean)?;
        writeln!(self.out, "  Valid cells: {}", statistic.valid_count)
    }

    fn show_correlation(&mut self, title: &str, result: &CorrelationResult) -> io::Result<()> {
        match result {
            CorrelationResult::Defined { r, count } => {
                writeln!(self.out, "{}: {:.2} (n = {})", title, r, count)
            }
            CorrelationResult::Undefined { reason, count } => writeln!(
                self.out,
                "{}: undefined ({}, n = {})",
                title, reason, count
            ),
        }
    }

    fn show_series(&mut self, series: &TimeSeries) -> io::Result<()> {
        let width = series.iter().map(|e| e.label.len()).max().unwrap_or(0);
        for entry in series.iter() {
            match entry.mean() {
                Some(mean) => writeln!(self.out, "{:<width$}  {:>12.4}", entry.label, mean)?,
                None => writeln!(self.out, "{:<width$}  {:>12}", entry.label, "missing")?,
            }
        }
        if series.missing_count() > 0 {
            writeln!(self.out, "{} of {} steps missing", series.missing_count(), series.len())?;
        }
        Ok(())
    }

    fn show_activity(&mut self, activity: &[CountryActivity]) -> io::Result<()> {
        let width = activity.iter().map(|a| a.name.len()).max().unwrap_or(0).max(7);
        writeln!(
            self.out,
            "{:<width$}  {:>16}  {:>12}  {:>14}",
            "Country", "Total light", "Mean", "GDP (M USD)"
        )?;
        for a in activity {
            match a.statistic {
                Some(s) => writeln!(
                    self.out,
                    "{:<width$}  {:>16.2}  {:>12.4}  {:>14.1}",
                    a.name, s.sum, s.mean, a.gdp
                )?,
                None => writeln!(
                    self.out,
                    "{:<width$}  {:>16}  {:>12}  {:>14.1}",
                    a.name, "-", "-", a.gdp
                )?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightlight_analysis::correlation::UndefinedReason;
    use nightlight_analysis::reduce::EagerReducer;
    use nightlight_analysis::time_series::aggregate;
    use nightlight_core::{GeoTransform, MaskedGrid};

    fn render(f: impl FnOnce(&mut ConsolePresenter<Vec<u8>>) -> io::Result<()>) -> String {
        let mut p = ConsolePresenter::new(Vec::new());
        f(&mut p).unwrap();
        String::from_utf8(p.into_inner()).unwrap()
    }

    #[test]
    fn test_correlation_output() {
        let defined = render(|p| {
            p.show_correlation("r", &CorrelationResult::Defined { r: 0.8731, count: 12 })
        });
        assert_eq!(defined, "r: 0.87 (n = 12)\n");

        let undefined = render(|p| {
            p.show_correlation(
                "r",
                &CorrelationResult::Undefined {
                    reason: UndefinedReason::ZeroVariance,
                    count: 3,
                },
            )
        });
        assert_eq!(undefined, "r: undefined (zero variance, n = 3)\n");
    }

    #[test]
    fn test_series_marks_missing() {
        let grids = vec![
            MaskedGrid::from_vec(vec![1.0, 3.0], 1, 2, Some(0.0), GeoTransform::default()).unwrap(),
            MaskedGrid::from_vec(vec![0.0, 0.0], 1, 2, Some(0.0), GeoTransform::default()).unwrap(),
        ];
        let series = aggregate(&grids, &["Jan", "Feb"], &EagerReducer).unwrap();
        let text = render(|p| p.show_series(&series));

        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Jan") && lines[0].ends_with("2.0000"));
        assert!(lines[1].starts_with("Feb") && lines[1].ends_with("missing"));
        assert_eq!(lines[2], "1 of 2 steps missing");
    }
}
