//! Line-oriented command shell over a `StableSystem`.
//!
//! Parsing and execution are separate from I/O so the loop can be driven
//! from any reader/writer pair.

use std::io::{BufRead, Write};
use std::str::FromStr;

use rand::Rng;

use crate::error::SimResult;
use crate::report::{format_panel, format_summary};
use crate::state::StableSystem;

pub const PROMPT: &str = "command> ";

pub const HELP: &str = "Available commands:
  mint_doc <btc>
  mint_doc_amt <doc>
  redeem_doc <doc>
  mint_bpro <btc>
  redeem_bpro <bpro>
  set_price <price>
  advance_time <steps>
  summary
  panel
  help
  exit";

const UNKNOWN: &str = "Unknown command. Type 'help' for instructions.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    MintDoc(f64),
    MintDocAmount(f64),
    RedeemDoc(f64),
    MintBPro(f64),
    RedeemBPro(f64),
    SetPrice(f64),
    AdvanceTime(u64),
    Summary,
    Panel,
    Help,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Unknown,
    BadArgument(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "{UNKNOWN}"),
            Self::BadArgument(arg) => write!(f, "Error: could not parse {arg:?}"),
        }
    }
}

fn arg<T: FromStr>(value: &str) -> Result<T, ParseError> {
    value
        .parse()
        .map_err(|_| ParseError::BadArgument(value.to_string()))
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["mint_doc", v] => Ok(Self::MintDoc(arg(v)?)),
            ["mint_doc_amt", v] => Ok(Self::MintDocAmount(arg(v)?)),
            ["redeem_doc", v] => Ok(Self::RedeemDoc(arg(v)?)),
            ["mint_bpro", v] => Ok(Self::MintBPro(arg(v)?)),
            ["redeem_bpro", v] => Ok(Self::RedeemBPro(arg(v)?)),
            ["set_price", v] => Ok(Self::SetPrice(arg(v)?)),
            ["advance_time", v] => Ok(Self::AdvanceTime(arg(v)?)),
            ["summary"] => Ok(Self::Summary),
            ["panel"] => Ok(Self::Panel),
            ["help", ..] => Ok(Self::Help),
            ["exit", ..] | ["quit", ..] => Ok(Self::Exit),
            _ => Err(ParseError::Unknown),
        }
    }
}

/// Apply `command` and return the text to show.
pub fn execute(
    system: &mut StableSystem,
    command: Command,
    rng: &mut impl Rng,
) -> SimResult<String> {
    let out = match command {
        Command::MintDoc(btc) => {
            let c = system.mint_doc(btc);
            format!(
                "Minted {:.2} DoC with {:.4} BTC at {:.2} USD/BTC",
                c.doc, c.btc, c.price
            )
        }
        Command::MintDocAmount(doc) => {
            let c = system.mint_doc_amount(doc);
            format!(
                "Minted {:.2} DoC with {:.4} BTC at {:.2} USD/BTC",
                c.doc, c.btc, c.price
            )
        }
        Command::RedeemDoc(doc) => {
            let c = system.redeem_doc(doc)?;
            format!(
                "Redeemed {:.2} DoC for {:.4} BTC at {:.2} USD/BTC",
                c.doc, c.btc, c.price
            )
        }
        Command::MintBPro(btc) => {
            let minted = system.mint_bpro(btc);
            format!("Minted {minted:.4} BPro with {minted:.4} BTC")
        }
        Command::RedeemBPro(bpro) => {
            let returned = system.redeem_bpro(bpro)?;
            format!("Redeemed {returned:.4} BPro for {returned:.4} BTC")
        }
        Command::SetPrice(price) => {
            system.set_price(price);
            format!("BTC price set to {:.2} USD", system.price)
        }
        Command::AdvanceTime(steps) => {
            system.advance_time(steps, rng);
            format!(
                "Advanced time by {steps} units. BTC price is now {:.2} USD",
                system.price
            )
        }
        Command::Summary => format_summary(system),
        Command::Panel => format_panel(system),
        Command::Help => HELP.to_string(),
        Command::Exit => String::new(),
    };
    Ok(out)
}

/// Read commands until `exit`/`quit` or end of input. Command failures are
/// reported and the loop continues.
pub fn run_repl<R: BufRead, W: Write>(
    system: &mut StableSystem,
    input: R,
    mut output: W,
    rng: &mut impl Rng,
) -> std::io::Result<()> {
    writeln!(output, "Interactive Money on Chain simulation")?;
    writeln!(output, "{HELP}")?;
    write!(output, "{PROMPT}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            write!(output, "{PROMPT}")?;
            output.flush()?;
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Exit) => return Ok(()),
            Ok(command) => match execute(system, command, rng) {
                Ok(text) => writeln!(output, "{text}")?,
                Err(e) => writeln!(output, "Error: {e}")?,
            },
            Err(e) => writeln!(output, "{e}")?,
        }
        write!(output, "{PROMPT}")?;
        output.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(script: &str) -> (StableSystem, String) {
        let mut system = StableSystem::default();
        let mut out = Vec::new();
        let mut rng = StdRng::seed_from_u64(1);
        run_repl(&mut system, script.as_bytes(), &mut out, &mut rng).unwrap();
        (system, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("mint_doc 0.2".parse::<Command>(), Ok(Command::MintDoc(0.2)));
        assert_eq!("  advance_time   3 ".parse::<Command>(), Ok(Command::AdvanceTime(3)));
        assert_eq!("quit".parse::<Command>(), Ok(Command::Exit));
        assert_eq!("summary".parse::<Command>(), Ok(Command::Summary));
        assert_eq!("summary now".parse::<Command>(), Err(ParseError::Unknown));
        assert_eq!("mint_doc".parse::<Command>(), Err(ParseError::Unknown));
        assert!(matches!(
            "mint_doc lots".parse::<Command>(),
            Err(ParseError::BadArgument(_))
        ));
    }

    #[test]
    fn test_session_mints_and_redeems() {
        let (system, out) = run("mint_doc 0.2\nredeem_doc 100\nexit\nmint_doc 5\n");

        assert!((system.doc_supply - 4950.0).abs() < 1e-9);
        assert!((system.btc_collateral - 100.196).abs() < 1e-9);
        assert!(out.contains("Minted 5000.00 DoC with 0.2000 BTC at 25000.00 USD/BTC"));
        assert!(out.contains("Redeemed 100.00 DoC for 0.0040 BTC"));
    }

    #[test]
    fn test_errors_do_not_stop_the_loop() {
        let (system, out) = run("redeem_bpro 1\nbogus\nset_price 30000\n");

        assert!(out.contains("Error: not enough BPro tokens to redeem"));
        assert!(out.contains(UNKNOWN));
        assert!(out.contains("BTC price set to 30000.00 USD"));
        assert_eq!(system.price, 30000.0);
    }

    #[test]
    fn test_advance_time_moves_clock() {
        let (system, out) = run("advance_time 4\npanel\n");
        assert_eq!(system.time, 4);
        assert!(out.contains("Advanced time by 4 units"));
        assert!(out.contains("=== System Panel ==="));
    }
}
