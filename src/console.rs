use crate::config::AppConfig;
use crate::errors::EngineResult;
use crate::models::implied_vol::{self, SolverConfig};
use crate::models::black_scholes::BlackScholesMerton;
use crate::models::{OptionKind, OptionParams};
use std::io::{BufRead, Write};

/// Interactive console: price one option, optionally back out its IV.
/// Generic over the streams so it can be driven from tests.
/// Returns cleanly on "quit" or end of input.
pub fn run<R: BufRead, W: Write>(input: R, output: W, config: &AppConfig) -> EngineResult<()> {
    let mut io = Prompter { input, output };
    writeln!(io.output, "Option Pricing (console)")?;

    loop {
        writeln!(io.output, "\nChoose an action:")?;
        writeln!(io.output, "  1) Single Option (BSM)")?;
        writeln!(io.output, "  2) Quit")?;
        let Some(choice) = io.text("Enter choice", Some("1"))? else {
            return Ok(());
        };
        match choice.as_str() {
            "1" => {
                if single_option_flow(&mut io, config)?.is_none() {
                    return Ok(());
                }
            }
            "2" | "q" | "quit" => {
                writeln!(io.output, "Goodbye!")?;
                return Ok(());
            }
            _ => writeln!(io.output, "Unknown choice. Try again.")?,
        }
    }
}

/// `Ok(None)` means input ran out mid-flow.
fn single_option_flow<R: BufRead, W: Write>(
    io: &mut Prompter<R, W>,
    config: &AppConfig,
) -> EngineResult<Option<()>> {
    writeln!(io.output, "\n=== Single Option (Black-Scholes-Merton) ===")?;

    let Some(spot) = io.positive("Spot price (S)")? else { return Ok(None) };
    let Some(strike) = io.positive("Strike price (K)")? else { return Ok(None) };
    let Some(rate) = io.percent("Risk-free rate (r)", config.default_rate * 100.0)? else {
        return Ok(None);
    };
    let Some(dividend_yield) = io.percent("Dividend yield (q)", config.default_dividend_yield * 100.0)? else {
        return Ok(None);
    };
    let Some(vol) = io.percent("Volatility (sigma)", 25.0)? else { return Ok(None) };
    let Some(days) = io.number("Days to expiry", Some(30.0))? else { return Ok(None) };
    let Some(kind_text) = io.text("Option type [call/put]", Some("call"))? else {
        return Ok(None);
    };
    let kind = match kind_text.parse::<OptionKind>() {
        Ok(kind) => kind,
        Err(_) => {
            writeln!(io.output, "Invalid option type. Defaulting to 'call'.")?;
            OptionKind::Call
        }
    };

    let params = OptionParams::from_days(spot, strike, rate, dividend_yield, days.max(0.0), kind);
    let report = params.report(vol.max(0.0));
    let g = report.greeks;

    writeln!(io.output, "\n--- Results ---")?;
    writeln!(io.output, "Price: {:.6}", report.price)?;
    writeln!(io.output, "Greeks (per 1.00):")?;
    writeln!(io.output, "  Delta: {:.6}", g.delta)?;
    writeln!(io.output, "  Gamma: {:.6}", g.gamma)?;
    writeln!(io.output, "  Vega:  {:.6}", g.vega)?;
    writeln!(io.output, "  Theta: {:.6} per year", g.theta)?;
    writeln!(io.output, "  Rho:   {:.6}", g.rho)?;

    let Some(market_text) = io.text("Enter market option price to solve IV (blank to skip)", Some(""))? else {
        return Ok(None);
    };
    if !market_text.is_empty() {
        match market_text.parse::<f64>() {
            Ok(market_price) => report_iv(io, &params, market_price, &config.solver)?,
            Err(_) => writeln!(io.output, "Invalid number. Skipping IV solve.")?,
        }
    }
    Ok(Some(()))
}

fn report_iv<R: BufRead, W: Write>(
    io: &mut Prompter<R, W>,
    params: &OptionParams,
    market_price: f64,
    solver: &SolverConfig,
) -> EngineResult<()> {
    let res = implied_vol::solve(&BlackScholesMerton, params, market_price, solver);
    match res.converged_volatility() {
        Some(vol) => writeln!(
            io.output,
            "Implied Vol: {vol:.6} ({:.2}%) in {} iterations",
            vol * 100.0,
            res.iterations
        )?,
        None => writeln!(io.output, "IV solve failed: {}", res.message)?,
    }
    Ok(())
}

struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Raw trimmed line; `None` at end of input.
    fn line(&mut self, prompt: &str, default: Option<&str>) -> EngineResult<Option<String>> {
        match default {
            Some(d) if !d.is_empty() => write!(self.output, "{prompt} [{d}]: ")?,
            _ => write!(self.output, "{prompt}: ")?,
        }
        self.output.flush()?;

        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(buf.trim().to_string()))
    }

    fn text(&mut self, prompt: &str, default: Option<&str>) -> EngineResult<Option<String>> {
        loop {
            let Some(text) = self.line(prompt, default)? else { return Ok(None) };
            if !text.is_empty() {
                return Ok(Some(text));
            }
            if let Some(d) = default {
                return Ok(Some(d.to_string()));
            }
            writeln!(self.output, "Please enter a value.")?;
        }
    }

    fn number(&mut self, prompt: &str, default: Option<f64>) -> EngineResult<Option<f64>> {
        let default_text = default.map(|d| d.to_string());
        loop {
            let Some(text) = self.line(prompt, default_text.as_deref())? else {
                return Ok(None);
            };
            if text.is_empty() {
                if let Some(d) = default {
                    return Ok(Some(d));
                }
            }
            match text.parse::<f64>() {
                Ok(v) if v.is_finite() => return Ok(Some(v)),
                _ => writeln!(self.output, "Invalid number. Try again.")?,
            }
        }
    }

    fn positive(&mut self, prompt: &str) -> EngineResult<Option<f64>> {
        loop {
            let Some(v) = self.number(prompt, None)? else { return Ok(None) };
            if v > 0.0 {
                return Ok(Some(v));
            }
            writeln!(self.output, "Value must be positive.")?;
        }
    }

    /// Reads a percentage and returns it as a decimal.
    fn percent(&mut self, prompt: &str, default_pct: f64) -> EngineResult<Option<f64>> {
        Ok(self
            .number(&format!("{prompt} (%)"), Some(default_pct))?
            .map(|v| v / 100.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(script: &str) -> String {
        let mut out = Vec::new();
        run(script.as_bytes(), &mut out, &AppConfig::default()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_quit_immediately() {
        let out = drive("2\n");
        assert!(out.contains("Goodbye!"));
    }

    #[test]
    fn test_single_option_with_defaults_and_iv() {
        // S, K, then defaults for r, q, sigma, days, kind; then a market price
        let out = drive("1\n100\n100\n\n\n\n\n\n2.33\n2\n");
        assert!(out.contains("Price: 3.021141"), "{out}");
        assert!(out.contains("Delta: 0.532560"), "{out}");
        assert!(out.contains("Implied Vol: 0.1893"), "{out}");
        assert!(out.contains("(18.94%)"), "{out}");
        assert!(out.contains("Goodbye!"));
    }

    #[test]
    fn test_reprompts_and_reports_failure() {
        let out = drive("1\nabc\n-5\n100\n100\n\n\n\n\nstraddle\n500\n");
        assert!(out.contains("Invalid number. Try again."), "{out}");
        assert!(out.contains("Value must be positive."), "{out}");
        assert!(out.contains("Defaulting to 'call'"), "{out}");
        assert!(out.contains("IV solve failed: market price outside theoretical bounds"), "{out}");
    }

    #[test]
    fn test_eof_mid_flow_exits_cleanly() {
        let out = drive("1\n100\n");
        assert!(out.contains("Strike price (K)"));
    }

    #[test]
    fn test_write_failure_is_propagated() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let err = run("2\n".as_bytes(), Broken, &AppConfig::default()).unwrap_err();
        assert!(matches!(err, crate::errors::EngineError::Io(_)), "{err}");
    }

    #[test]
    fn test_unknown_choice() {
        let out = drive("7\n2\n");
        assert!(out.contains("Unknown choice. Try again."));
    }
}
