use std::process::ExitCode;
use std::str::FromStr;

use clap::Parser;
use log::{debug, error, info, LevelFilter};
use unordered_pair::UnorderedPair;

use gridlogic::rules::{BanPatternRule, CellCountRule, ConnectAllRule, NoLoopsRule};
use gridlogic::solver::{CancellationToken, Candidate, SolverRegistry};
use gridlogic::symbols::{AreaNumberSymbol, LetterSymbol, MinesweeperSymbol};
use gridlogic::{validate_grid, Anchor, Color, Connections, Grid, Location, Rule, Symbol, WrapMode};

/// Solve a two-color grid puzzle given as rows of `b` (dark), `w` (light), `n` (undetermined) and `.` (hole).
/// Uppercase letters are givens.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Grid rows, top to bottom
    #[arg(required = true)]
    rows: Vec<String>,

    /// Solver to run
    #[arg(short, long, default_value = "auto")]
    solver: String,

    /// Stop after this many solutions
    #[arg(short = 'n', long, default_value_t = 2)]
    count: usize,

    /// Wrap mode of the left and right edges
    #[arg(long, default_value = "none")]
    wrap_x: WrapMode,

    /// Wrap mode of the top and bottom edges
    #[arg(long, default_value = "none")]
    wrap_y: WrapMode,

    /// Forbid loops of this color
    #[arg(long, value_parser = parse_color)]
    no_loops: Vec<Color>,

    /// Require all cells of this color to be connected
    #[arg(long, value_parser = parse_color)]
    connect_all: Vec<Color>,

    /// Require exactly N cells of a color, as `color:N`
    #[arg(long, value_parser = parse_cell_count)]
    cell_count: Vec<CellCountRule>,

    /// Ban a pattern in any rotation or reflection, as rows separated by `/`
    #[arg(long, value_parser = parse_pattern)]
    ban: Vec<BanPatternRule>,

    /// Accept solutions that leave cells undetermined
    #[arg(long)]
    underclued: bool,

    /// Area number clue, as `x,y,N`
    #[arg(long, value_parser = parse_clue::<usize>)]
    area: Vec<(Anchor, usize)>,

    /// Letter clue, as `x,y,C`
    #[arg(long, value_parser = parse_clue::<char>)]
    letter: Vec<(Anchor, char)>,

    /// Minesweeper clue, as `x,y,N`
    #[arg(long, value_parser = parse_clue::<usize>)]
    mines: Vec<(Anchor, usize)>,

    /// Force two cells to share a color, as `x1,y1:x2,y2`
    #[arg(long, value_parser = parse_connection)]
    connect: Vec<UnorderedPair<Location>>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_color(s: &str) -> Result<Color, String> {
    Color::from_str(s).map_err(|_| format!("unknown color {s:?}, expected dark, light or empty"))
}

fn parse_cell_count(s: &str) -> Result<CellCountRule, String> {
    let (color, count) = s.split_once(':').ok_or("expected color:N")?;
    let count = count.parse().map_err(|_| format!("invalid count {count:?}"))?;
    Ok(CellCountRule::new(parse_color(color)?, count))
}

fn parse_pattern(s: &str) -> Result<BanPatternRule, String> {
    let rows = s.split('/').collect::<Vec<_>>();
    BanPatternRule::from_rows(&rows).ok_or_else(|| format!("invalid pattern {s:?}"))
}

fn parse_clue<T: FromStr>(s: &str) -> Result<(Anchor, T), String> {
    let mut parts = s.splitn(3, ',');
    let (Some(x), Some(y), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err("expected x,y,value".to_string());
    };
    let x = x.parse::<f64>().map_err(|_| format!("invalid x {x:?}"))?;
    let y = y.parse::<f64>().map_err(|_| format!("invalid y {y:?}"))?;
    let value = value.parse::<T>().map_err(|_| format!("invalid value {value:?}"))?;
    Ok((Anchor::new(x, y), value))
}

fn parse_location(s: &str) -> Result<Location, String> {
    let (x, y) = s.split_once(',').ok_or("expected x,y")?;
    match (x.parse(), y.parse()) {
        (Ok(x), Ok(y)) => Ok(Location(x, y)),
        _ => Err(format!("invalid location {s:?}")),
    }
}

fn parse_connection(s: &str) -> Result<UnorderedPair<Location>, String> {
    let (a, b) = s.split_once(':').ok_or("expected x1,y1:x2,y2")?;
    Ok(UnorderedPair(parse_location(a)?, parse_location(b)?))
}

fn init_logger(debug_enabled: bool) {
    let level = if debug_enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter(None, level)
        .format_timestamp(None)
        .format_target(false);

    // RUST_LOG wins over the flag
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    builder.init();
}

fn build_grid(cli: &Cli) -> Result<Grid, String> {
    let rows = cli.rows.iter().map(String::as_str).collect::<Vec<_>>();
    let mut grid = Grid::from_rows(&rows).map_err(|err| err.to_string())?;

    let mut connections = Connections::new();
    for pair in cli.connect.iter() {
        if !grid.topology().is_in_bounds(pair.0.0 as isize, pair.0.1 as isize)
            || !grid.topology().is_in_bounds(pair.1.0 as isize, pair.1.1 as isize)
        {
            return Err(format!("connection {:?} is out of bounds", pair));
        }
        connections.connect(*pair);
    }
    grid = grid.with_connections(connections).with_wrap(cli.wrap_x, cli.wrap_y);

    let mut rules = Vec::new();
    rules.extend(cli.no_loops.iter().map(|color| Rule::NoLoops(NoLoopsRule::new(*color))));
    rules.extend(cli.connect_all.iter().map(|color| Rule::ConnectAll(ConnectAllRule::new(*color))));
    rules.extend(cli.cell_count.iter().map(|rule| Rule::CellCount(*rule)));
    rules.extend(cli.ban.iter().cloned().map(Rule::BanPattern));
    if cli.underclued {
        rules.push(Rule::Underclued);
    }

    let mut symbols = Vec::new();
    symbols.extend(cli.area.iter().map(|(anchor, n)| Symbol::AreaNumber(AreaNumberSymbol::new(*anchor, *n))));
    symbols.extend(cli.letter.iter().map(|(anchor, c)| Symbol::Letter(LetterSymbol::new(*anchor, *c))));
    symbols.extend(cli.mines.iter().map(|(anchor, n)| Symbol::Minesweeper(MinesweeperSymbol::new(*anchor, *n))));
    if let Some(symbol) = symbols.iter().find(|symbol| !symbol.anchor().is_in_bounds(grid.topology())) {
        return Err(format!("{} at {} is out of bounds", symbol.id(), symbol.anchor()));
    }

    Ok(grid.with_rules(rules).with_symbols(symbols))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let grid = match build_grid(&cli) {
        Ok(grid) => grid,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let registry = SolverRegistry::with_defaults();
    let solver = match registry.require(&cli.solver) {
        Ok(solver) => solver,
        Err(err) => {
            error!("{err}; available: {}", registry.ids().join(", "));
            return ExitCode::FAILURE;
        }
    };
    debug!("environment supported: {}", solver.is_environment_supported());

    let solutions = match solver.solve(&grid, &CancellationToken::new()) {
        Ok(solutions) => solutions,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut found = 0;
    for candidate in solutions.take(cli.count + 1) {
        match candidate {
            Candidate::Found(solution) if found < cli.count => {
                found += 1;
                let validation = validate_grid(&solution, None);
                println!("solution {found} ({}):\n{solution}", validation.final_state);
            }
            Candidate::Found(_) => {
                info!("stopping after {} solutions", cli.count);
                break;
            }
            Candidate::NoMoreSolutions => {
                info!("no more solutions");
                break;
            }
        }
    }
    if found == 0 {
        println!("no solution");
    }

    ExitCode::SUCCESS
}
