extern crate chrono;
extern crate clap;
extern crate fern;
#[macro_use]
extern crate log;
extern crate term_grid;

use clap::{App, Arg, ArgMatches};
use term_grid::{Cell, Direction, Filling, Grid, GridOptions};

use std::fs::File;
use std::io::Read;
use std::path::Path;

use packasm::syntax::{self, ParseError, ParseOptions, Parser};

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    let input = args.value_of("INPUT").unwrap_or("-");
    let options = ParseOptions {
        memoize: !args.is_present("no-memo"),
    };

    debug!(
        "Arguments:\n\tVerbosity: {}\n\tExpression: {}\n\tMemoize: {}\n\tInfile: {}",
        verbosity(args.occurrences_of("verbose")),
        args.is_present("expr"),
        options.memoize,
        input
    );

    let reader = open_input(input);

    if args.is_present("expr") {
        let text = read_all(reader, input);
        match syntax::parse_expression(&text) {
            Ok(expr) => println!("{}", expr),
            Err(err) => fail(&err),
        }
        return;
    }

    let mut parser = Parser::with_options(syntax::tokenize(reader), options);
    let file = match parser.parse_file() {
        Ok(file) => file,
        Err(err) => fail(&err),
    };
    info!("parsed {} statement(s) from `{}`", file.stmts.len(), input);

    if args.is_present("print-debug") {
        let mut grid = Grid::new(GridOptions {
            filling: Filling::Spaces(1),
            direction: Direction::LeftToRight,
        });

        for stmt in &file.stmts {
            let (line_num, source) = match stmt.toks().first() {
                Some(tok) => (tok.line_num, tok.line.trim().to_owned()),
                None => (0, String::new()),
            };
            grid.add(Cell::from(format!("{:04}:", line_num)));
            grid.add(Cell::from(format!("{}", stmt)));
            grid.add(Cell::from("<=".to_string()));
            grid.add(Cell::from(source));
        }

        println!("{}", grid.fit_into_columns(4));
    } else {
        print!("{}", file);
    }
}

fn open_input(input: &str) -> Box<dyn Read> {
    if input == "-" {
        return Box::new(std::io::stdin());
    }

    let ipath = Path::new(input);
    match File::open(&ipath) {
        Err(err) => {
            error!("fatal: unable to open input file `{}`: {}", ipath.display(), err);
            std::process::exit(1);
        }
        Ok(file) => Box::new(file),
    }
}

fn read_all(mut reader: Box<dyn Read>, input: &str) -> String {
    let mut text = String::new();
    if let Err(err) = reader.read_to_string(&mut text) {
        error!("fatal: unable to read input `{}`: {}", input, err);
        std::process::exit(1);
    }
    text
}

fn fail(err: &ParseError) -> ! {
    eprintln!("{}", err.render());
    error!("Stopped parsing due to a syntax error.");
    std::process::exit(1);
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(Arg::with_name("INPUT")
            .help("Sets the input file to use, `-` for stdin")
            .multiple(false)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("expr")
            .short("x")
            .long("expr")
            .takes_value(false)
            .help("parses the input as a single expression"))
        .arg(Arg::with_name("no-memo")
            .long("no-memo")
            .takes_value(false)
            .help("disables memoization of rule results"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .alias("show")
            .alias("s")
            .takes_value(false)
            .help("prints each statement alongside its source line"))
        .get_matches()
}

fn verbosity(occurrences: u64) -> log::LevelFilter {
    match occurrences {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

fn initialize_logging(occurrences: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(verbosity(occurrences))
        .chain(std::io::stderr())
        .apply()
        .ok();
}
