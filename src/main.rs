//! Wiretap CLI - exercise call interception on a sample object graph
//!
//! Commands:
//!   wiretap demo  - Wiretap a sample module and class, drive calls, print reports

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;
use wiretap::value::Bound;
use wiretap::{
    wiretap_class_method, wiretap_function, Args, CallError, CallReport, Class, Function, Logbook,
    Namespace, Signature, Value,
};

#[derive(Parser)]
#[command(name = "wiretap")]
#[command(about = "Record calls to wiretapped functions and methods", long_about = None)]
struct Cli {
    /// Log wiretap activity to stderr (filter with RUST_LOG)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wiretap a sample module and class, call them, and print the reports
    Demo {
        /// Number of threads making calls
        #[arg(long, short = 't', default_value_t = 1)]
        threads: usize,

        /// Calls per thread to each wiretapped member
        #[arg(long, short = 'n', default_value_t = 2)]
        calls: usize,

        /// Output reports as JSON lines
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Commands::Demo {
            threads,
            calls,
            json,
        } => demo_command(threads.max(1), calls, json),
    }
}

fn demo_command(threads: usize, calls: usize, json: bool) -> anyhow::Result<()> {
    let module = Arc::new(sample_module());
    let class = sample_class();
    let logbook = Logbook::new();

    wiretap_function(&module, "my_fun", logbook.clone())?;
    wiretap_function(&module, "greet", logbook.clone())?;
    for method in ["normal_method", "static_method", "class_method"] {
        wiretap_class_method(&class, method, logbook.clone())?;
    }

    let workers: Vec<_> = (0..threads)
        .map(|worker| {
            let module = Arc::clone(&module);
            let class = Arc::clone(&class);
            thread::Builder::new()
                .name(format!("caller-{worker}"))
                .spawn(move || drive_calls(&module, &class, worker, calls))
        })
        .collect::<Result<_, _>>()?;

    for worker in workers {
        worker
            .join()
            .map_err(|_| anyhow::anyhow!("caller thread panicked"))??;
    }

    let reports = logbook.drain();
    if json {
        for report in &reports {
            println!("{}", serde_json::to_string(report)?);
        }
    } else {
        for report in &reports {
            print_report(report);
        }
        println!("{} calls recorded", reports.len());
    }

    Ok(())
}

fn drive_calls(
    module: &Namespace,
    class: &Arc<Class>,
    worker: usize,
    calls: usize,
) -> Result<(), CallError> {
    let instance = class.instantiate();
    for call in 0..calls {
        let n = (worker * calls + call) as i64;
        module.call("my_fun", Args::new())?;
        module.call("greet", Args::new().arg("Reyes").kwarg("excited", n % 2 == 0))?;
        instance.call_method("normal_method", Args::new().arg(n))?;
        class.call_method("static_method", Args::new().arg(n).kwarg("three", 4))?;
        instance.call_method("class_method", Args::new().arg(1).kwarg("two", 2))?;
    }
    Ok(())
}

fn sample_module() -> Namespace {
    let module = Namespace::new("sample");
    module
        .define(Function::variadic("my_fun", |_| Ok(Value::S64(5))))
        .define(Function::new(
            "greet",
            Signature::new()
                .param("name")
                .keyword_only("excited", Some(Value::Bool(false))),
            |args| {
                let name = args.require("name")?.as_str()?;
                let mark = if args.require("excited")?.as_bool()? { "!" } else { "." };
                Ok(Value::String(format!("Hello, {name}{mark}")))
            },
        ));
    module
}

fn sample_class() -> Arc<Class> {
    let echo = |args: Bound| -> Result<Value, CallError> {
        Ok(Value::Tuple(vec![
            Value::Tuple(args.rest().to_vec()),
            Value::Map(args.extra().clone().into_iter().collect()),
        ]))
    };
    let class = Class::new("TestingClass");
    class
        .method(Function::new(
            "normal_method",
            Signature::new().param("self").var_args("a").var_kwargs("kw"),
            echo,
        ))
        .static_method(Function::new(
            "static_method",
            Signature::variadic(),
            echo,
        ))
        .class_method(Function::new(
            "class_method",
            Signature::new().param("cls").var_args("a").var_kwargs("kw"),
            echo,
        ));
    class
}

fn print_report(report: &CallReport) {
    let mut args: Vec<String> = report.function_args.iter().map(format_value).collect();
    let mut kwargs: Vec<String> = report
        .function_kwargs
        .iter()
        .map(|(k, v)| format!("{}={}", k, format_value(v)))
        .collect();
    kwargs.sort();
    args.extend(kwargs);
    println!(
        "#{:<4} [{}] {}({})",
        report.sequence,
        report.thread.as_deref().unwrap_or("-"),
        report.function_name,
        args.join(", ")
    );
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Unit => "()".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::S64(n) => n.to_string(),
        Value::U64(n) => n.to_string(),
        Value::F64(n) => n.to_string(),
        Value::Char(c) => format!("{:?}", c),
        Value::String(s) => format!("{:?}", s),
        Value::List(items) => format!(
            "[{}]",
            items.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Tuple(items) => format!(
            "({})",
            items.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Map(entries) => format!(
            "{{{}}}",
            entries
                .iter()
                .map(|(k, v)| format!("{:?}: {}", k, format_value(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Shared(cell) => cell
            .visit(|inner| format!("shared({})", format_value(inner)))
            .unwrap_or_else(|| "shared(...)".to_string()),
        Value::Class(class) => format!("<class {}>", class.name()),
        Value::Instance(instance) => {
            format!("<{} #{}>", instance.class().name(), instance.id())
        }
        Value::Function(function) => format!("<function {}>", function.name()),
    }
}
