#![warn(rust_2018_idioms, clippy::print_stdout)]

use ast::{json, ExprDiscriminants, Feature};
use compiler_shared::{timed_scope, timing, Context};
use failure::{Error, Fail, ResultExt};
use std::{
    fs::File,
    io::{self, BufReader, Write},
    panic,
    path::PathBuf,
    process::exit,
    thread,
};
use strtab::StringTable;
use structopt::StructOpt;
use termcolor::{ColorChoice, StandardStream};
use type_checking::{Analysis, CheckerOptions, WellKnownSymbols};

#[derive(Debug, Fail)]
pub enum CliError {
    #[fail(display = "cannot open input file {:?}", path)]
    OpenInput { path: PathBuf },
    #[fail(display = "cannot read syntax tree from {:?}", path)]
    ReadInput { path: PathBuf },
    #[fail(display = "cannot write the inferred types")]
    PrintTypes,
    #[fail(display = "cannot start the analysis thread")]
    SpawnAnalysis,
}

#[derive(StructOpt)]
#[structopt(name = "coolsem")]
pub struct CliCommand {
    /// Syntax tree of the program to analyse, serialized as JSON.
    #[structopt(name = "FILE", parse(from_os_str))]
    input: PathBuf,
    /// Print the inferred type of every feature and expression after a
    /// successful analysis.
    #[structopt(long = "print-types")]
    print_types: bool,
    /// Expressions nested deeper than this are rejected.
    #[structopt(long = "max-depth", default_value = "1000")]
    max_depth: usize,
    /// Log what the analysis does, same as `RUST_LOG=debug`.
    #[structopt(short = "v", long = "verbose")]
    verbose: bool,
}

/// How the analysis of a readable program ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Accepted,
    Rejected,
}

const EXIT_REJECTED: i32 = 1;
const EXIT_UNREADABLE: i32 = 2;

/// Reading the syntax tree recurses once per nesting level of its JSON
/// text, so the analysis runs on a thread with a stack this large.
const ANALYSIS_STACK_SIZE: usize = 256 * 1024 * 1024;

fn main() {
    let cmd = CliCommand::from_args();
    init_logging(cmd.verbose);

    let code = match run_on_analysis_thread(cmd) {
        Ok(Verdict::Accepted) => 0,
        Ok(Verdict::Rejected) => EXIT_REJECTED,
        Err(err) => {
            print_error(&mut io::stderr(), &err).expect("unable to print error");
            EXIT_UNREADABLE
        }
    };

    if let Err(err) = timing::print() {
        print_error(&mut io::stderr(), &err).expect("unable to print error");
    }
    exit(code);
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn run_on_analysis_thread(cmd: CliCommand) -> Result<Verdict, Error> {
    let analysis = thread::Builder::new()
        .name("analysis".to_string())
        .stack_size(ANALYSIS_STACK_SIZE)
        .spawn(move || run(&cmd))
        .context(CliError::SpawnAnalysis)?;
    match analysis.join() {
        Ok(verdict) => verdict,
        Err(payload) => panic::resume_unwind(payload),
    }
}

fn run(cmd: &CliCommand) -> Result<Verdict, Error> {
    let filename = cmd.input.to_string_lossy().into_owned();
    let raw = {
        timed_scope!("read");
        let file = File::open(&cmd.input).context(CliError::OpenInput {
            path: cmd.input.clone(),
        })?;
        json::read_program(BufReader::new(file), cmd.max_depth).context(
            CliError::ReadInput {
                path: cmd.input.clone(),
            },
        )?
    };

    let mut strtab = StringTable::new();
    let program = json::lower(&raw, &filename, &mut strtab);
    let symbols = WellKnownSymbols::new(&mut strtab);
    log::debug!(
        "read {} classes, {} distinct names",
        program.classes.len(),
        strtab.len()
    );

    let stderr = StandardStream::stderr(ColorChoice::Auto);
    let context = Context::new(Box::new(stderr));
    let options = CheckerOptions {
        max_nesting_depth: cmd.max_depth,
    };

    let result = type_checking::check(&program, symbols, &context, &options);
    context.diagnostics.write_statistics();

    match result {
        Ok(analysis) => {
            if cmd.print_types {
                let stdout = io::stdout();
                print_types(&mut stdout.lock(), &program, &analysis)
                    .context(CliError::PrintTypes)?;
            }
            Ok(Verdict::Accepted)
        }
        Err(halt) => {
            log::debug!("{}", halt);
            Ok(Verdict::Rejected)
        }
    }
}

/// Every feature with the type of its initializer or body, followed by
/// every annotated expression in tree order.
fn print_types<'src, 'ast>(
    out: &mut dyn Write,
    program: &'ast ast::Program<'src>,
    analysis: &Analysis<'src, 'ast>,
) -> io::Result<()> {
    let type_of = |expr: &'ast ast::Located<ast::Expr<'src>>| {
        analysis
            .types
            .expr_type(expr)
            .map_or("-", |ty| ty.as_str())
    };

    for class in &program.classes {
        writeln!(out, "class {} inherits {}", class.name, class.parent)?;
        for feature in &class.features {
            match &feature.data {
                Feature::Attribute(attribute) => writeln!(
                    out,
                    "  {}: attribute {} : {} (initializer : {})",
                    feature.line,
                    attribute.name,
                    attribute.ty,
                    type_of(&*attribute.init)
                )?,
                Feature::Method(method) => writeln!(
                    out,
                    "  {}: method {} : {} (body : {})",
                    feature.line,
                    method.name,
                    method.return_type,
                    type_of(&*method.body)
                )?,
            }
        }
    }

    let mut annotated = Vec::new();
    for class in &program.classes {
        for feature in &class.features {
            let root = match &feature.data {
                Feature::Attribute(attribute) => &attribute.init,
                Feature::Method(method) => &method.body,
            };
            root.walk(&mut |expr| {
                if let Some(ty) = analysis.types.expr_type(expr) {
                    let kind = ExprDiscriminants::from(&expr.data);
                    annotated.push((class.filename, expr.line, kind, ty));
                }
            });
        }
    }

    writeln!(out, "expressions")?;
    for (filename, line, kind, ty) in annotated {
        writeln!(out, "  {}:{} {} : {}", filename, line, kind, ty)?;
    }
    Ok(())
}

/// Print error objects in a format intended for end users
fn print_error(writer: &mut dyn io::Write, err: &Error) -> Result<(), Error> {
    writeln!(writer, "error: {}", err.as_fail())?;
    for cause in err.iter_causes() {
        writeln!(writer, "caused by: {}", cause)?;
    }
    Ok(())
}
