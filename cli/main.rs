#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use itertools::Itertools;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use mandate::Calculator;
use mandate::assess::{Assessment, MetricsDelta};
use mandate::coefficients::CoefficientTable;
use mandate::config::{PolicyConfiguration, RawPolicy, ScenarioFile};
use mandate::draws::{DEFAULT_NUM_DRAWS, DEFAULT_SEED};
use mandate::economics::{CostBreakdown, DerivedMetrics, Settings};
use mandate::mrs::{MrsRow, Preference};
use mandate::scenario::ScenarioRegister;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(
    name = "mandate",
    about = "Public support and cost-benefit calculator for vaccine mandate designs",
    long_about = "Simulates public support for a vaccine mandate design with a mixed logit \
                 model estimated for Australia, France and Italy, and aggregates lives \
                 saved, monetised benefits and implementation costs."
)]
struct Cli {
    #[command(flatten)]
    simulation: SimulationArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct SimulationArgs {
    /// Seed of the draw panel
    #[arg(long, global = true, default_value_t = DEFAULT_SEED)]
    seed: u32,

    /// Number of simulated respondents
    #[arg(long, global = true, default_value_t = DEFAULT_NUM_DRAWS)]
    draws: usize,

    /// Coefficient table (.toml) replacing the built-in estimates
    #[arg(long, global = true, value_name = "TABLE")]
    coefficients: Option<PathBuf>,
}

#[derive(Args)]
struct PolicyArgs {
    /// Country code: AU, IT or FR
    #[arg(long, default_value = "AU")]
    country: String,

    /// Outbreak scenario: mild or severe
    #[arg(long, default_value = "mild")]
    outbreak: String,

    /// Scope: highrisk or all
    #[arg(long, default_value = "highrisk")]
    scope: String,

    /// Exemptions: medical, medrel or medrelpers
    #[arg(long, default_value = "medical")]
    exemptions: String,

    /// Coverage threshold that lifts the mandate: 0.5, 0.7 or 0.9
    #[arg(long, default_value = "0.5")]
    coverage: f64,

    /// Expected lives saved per 100,000 people
    #[arg(long, value_name = "LIVES")]
    lives: f64,
}

impl PolicyArgs {
    fn configuration(&self) -> Result<PolicyConfiguration, Box<dyn Error>> {
        let raw = RawPolicy {
            country: self.country.clone(),
            outbreak: self.outbreak.clone(),
            scope: self.scope.clone(),
            exemptions: self.exemptions.clone(),
            coverage: self.coverage,
            lives_per_100k: self.lives,
        };
        Ok(raw.validate()?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the share of the population supporting a mandate design
    #[command(about = "Estimate public support for a mandate design")]
    Support(PolicyArgs),

    /// Lives-saved equivalents of the design's departures from the reference
    #[command(about = "Marginal rates of substitution against lives saved")]
    Mrs(PolicyArgs),

    /// Evaluate one or more scenario files and compare consecutive results
    #[command(about = "Evaluate scenario files (support, costs, benefits, BCR)")]
    Evaluate {
        /// Scenario files (.toml) with [settings], [policy] and optional [costs]
        #[arg(value_name = "SCENARIO", required = true)]
        scenarios: Vec<PathBuf>,

        /// Fill in default costs when a scenario has no [costs] table
        #[arg(long)]
        default_costs: bool,
    },

    /// Default implementation costs for a country and outbreak scenario
    #[command(about = "Print the default cost breakdown")]
    DefaultCosts {
        /// Country code: AU, IT or FR
        #[arg(long, default_value = "AU")]
        country: String,

        /// Outbreak scenario: mild or severe
        #[arg(long, default_value = "mild")]
        outbreak: String,

        /// Population covered by the mandate
        #[arg(long, default_value = "1000000")]
        population: f64,

        /// Years of implementation
        #[arg(long, default_value = "1")]
        horizon_years: f64,
    },

    /// Write the active coefficient table to a file
    #[command(about = "Export the coefficient table (outputs: TOML)")]
    ExportTable {
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

fn build_calculator(args: &SimulationArgs) -> Result<Calculator, Box<dyn Error>> {
    let calculator = if args.seed == DEFAULT_SEED && args.draws == DEFAULT_NUM_DRAWS {
        Calculator::new()
    } else {
        Calculator::with_seed(args.seed, args.draws)?
    };

    match &args.coefficients {
        Some(path) => {
            log::info!("Loading coefficients from {}", path.display());
            Ok(calculator.with_table(CoefficientTable::load(path)?))
        }
        None => Ok(calculator),
    }
}

fn format_percent(probability: Option<f64>) -> String {
    probability.map_or_else(|| "n/a".to_string(), |p| format!("{:.1}%", p * 100.0))
}

fn describe(config: &PolicyConfiguration) -> String {
    format!(
        "{} ({}), {}, {}, {:.0}% coverage, {} lives saved per 100k",
        config.country().name(),
        config.severity(),
        config.scope().label(),
        config.exemption_policy().label(),
        config.coverage_threshold().fraction() * 100.0,
        config.lives_saved_per_100k()
    )
}

fn print_mrs(rows: &[MrsRow]) {
    if rows.is_empty() {
        println!("No departures from the reference design (or MRS undefined).");
        return;
    }
    for row in rows {
        let direction = match row.direction {
            Preference::MorePreferred => "more preferred",
            Preference::LessPreferred => "less preferred",
        };
        println!("  {}: {:+.2} lives per 100k ({direction})", row.label, row.value);
    }
}

fn print_costs(costs: &CostBreakdown, currency: &str) {
    println!(
        "  {}",
        costs
            .components()
            .iter()
            .map(|(name, amount)| format!("{name}: {amount:.0}"))
            .join(", ")
    );
    println!("  Total: {:.0} {currency}", costs.total());
}

fn print_metrics(metrics: &DerivedMetrics, settings: &Settings, assessment: &Assessment) {
    let currency = settings.currency_label();
    println!(
        "  Support: {} ({:?})",
        format_percent(metrics.support_probability),
        assessment.support
    );
    println!("  Lives saved: {:.1}", metrics.lives_saved_total);
    println!(
        "  Benefit ({}): {:.0} {currency}",
        settings.benefit_metric().label(),
        metrics.benefit_monetary
    );
    println!("  Cost: {:.0} {currency}", metrics.cost_total);
    println!("  Net benefit: {:.0} {currency}", metrics.net_benefit);
    match metrics.bcr {
        Some(bcr) => println!("  BCR: {bcr:.2} ({:?})", assessment.bcr),
        None => println!("  BCR: not defined (no costs entered)"),
    }
    println!("  Inputs: {:?}", assessment.data);
    println!("  Overall: {:?}", assessment.headline);
}

fn print_delta(delta: &MetricsDelta) {
    if delta.is_unchanged() {
        println!("  Change since previous scenario: none");
        return;
    }
    let support = delta
        .support_points
        .map_or_else(|| "n/a".to_string(), |d| format!("{d:+.1} pts"));
    let bcr = delta
        .bcr
        .map_or_else(|| "n/a".to_string(), |d| format!("{d:+.2}"));
    println!(
        "  Change since previous scenario: support {support}, BCR {bcr}, lives {:+.1}, cost {:+.0}",
        delta.lives_saved, delta.cost
    );
}

fn run_support(calculator: &Calculator, policy: &PolicyArgs) -> CliResult {
    let config = policy.configuration()?;
    println!("{}", describe(&config));
    println!(
        "Predicted support: {}",
        format_percent(calculator.estimate_support(&config))
    );
    Ok(())
}

fn run_mrs(calculator: &Calculator, policy: &PolicyArgs) -> CliResult {
    let config = policy.configuration()?;
    println!("{}", describe(&config));
    print_mrs(&calculator.compute_mrs(&config));
    Ok(())
}

fn run_evaluate(calculator: &Calculator, scenarios: &[PathBuf], default_costs: bool) -> CliResult {
    let mut register = ScenarioRegister::new();
    let mut previous: Option<DerivedMetrics> = None;

    for path in scenarios {
        println!("Loading scenario from: {}", path.display());
        let input = ScenarioFile::load(path)?.validate()?;
        let costs = match input.costs {
            Some(costs) => Some(costs),
            None if default_costs => Some(calculator.default_costs(&input.settings, &input.policy)),
            None => None,
        };

        let metrics = calculator
            .compute_derived_metrics(&input.settings, Some(&input.policy), costs.as_ref())
            .ok_or("scenario has no policy configuration")?;
        let assessment = calculator.assess(&metrics, &input.settings);
        let id = register.save(&input.settings, &input.policy, costs.as_ref(), &metrics);

        println!("Scenario {id}: {}", describe(&input.policy));
        print_metrics(&metrics, &input.settings, &assessment);
        print_mrs(&calculator.compute_mrs(&input.policy));
        if let Some(before) = &previous {
            print_delta(&MetricsDelta::between(before, &metrics));
        }
        previous = Some(metrics);
    }

    if register.len() > 1 {
        let best = register
            .iter()
            .filter_map(|s| s.metrics.support_probability.map(|p| (s.id, p)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((id, probability)) = best {
            println!(
                "Highest support: scenario {id} at {}",
                format_percent(Some(probability))
            );
        }
    }
    Ok(())
}

fn run_default_costs(
    country: &str,
    outbreak: &str,
    population: f64,
    horizon_years: f64,
) -> CliResult {
    let config = PolicyConfiguration::reference(country.parse()?, outbreak.parse()?, 0.0)?;
    let settings = Settings::new(population, 0.0)?
        .with_horizon_years(horizon_years)?
        .with_inferred_currency(config.country());
    let costs = mandate::economics::default_costs(&settings, &config);
    println!(
        "Default costs for {} ({}), population {population:.0}, {horizon_years} year(s):",
        config.country().name(),
        config.severity()
    );
    print_costs(&costs, settings.currency_label());
    Ok(())
}

fn run_export_table(calculator: &Calculator, output: &Path) -> CliResult {
    calculator.table().save(output)?;
    println!(
        "Coefficient table ({} entries) saved to: {}",
        calculator.table().len(),
        output.display()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli {
        simulation,
        command,
    } = Cli::parse();

    let result = match command {
        Some(Commands::Support(policy)) => {
            build_calculator(&simulation).and_then(|calculator| run_support(&calculator, &policy))
        }
        Some(Commands::Mrs(policy)) => {
            build_calculator(&simulation).and_then(|calculator| run_mrs(&calculator, &policy))
        }
        Some(Commands::Evaluate {
            scenarios,
            default_costs,
        }) => build_calculator(&simulation)
            .and_then(|calculator| run_evaluate(&calculator, &scenarios, default_costs)),
        Some(Commands::DefaultCosts {
            country,
            outbreak,
            population,
            horizon_years,
        }) => run_default_costs(&country, &outbreak, population, horizon_years),
        Some(Commands::ExportTable { output }) => build_calculator(&simulation)
            .and_then(|calculator| run_export_table(&calculator, &output)),
        None => {
            Cli::command().print_help().expect("print help");
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
