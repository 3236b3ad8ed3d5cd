//! Integration tests for wiretapping namespace functions

use std::sync::mpsc;
use wiretap::runtime::Attribute;
use wiretap::{
    wiretap_function, Args, CallError, CallReport, Function, Logbook, Namespace, Signature, Value,
    WiretapError,
};

/// A module-like namespace with `my_fun` plus any injected functions
fn fake_module(functions: Vec<Function>) -> Namespace {
    let module = Namespace::new("FakeTestingModule");
    module.define(Function::variadic("my_fun", |_| Ok(Value::Unit)));
    for function in functions {
        module.define(function);
    }
    module
}

fn wiretap_and_run(module: &Namespace, function_name: &str) -> Logbook {
    let logbook = Logbook::new();
    wiretap_function(module, function_name, logbook.clone()).expect("attach");
    module.call(function_name, Args::new()).expect("call");
    logbook
}

#[test]
fn test_injected_functions_take_args_and_kwargs_and_return() {
    // def function(name, *a, flag=False, **kw): return [a, flag]
    let function = Function::new(
        "function",
        Signature::new()
            .param("name")
            .var_args("a")
            .keyword_only("flag", Some(Value::Bool(false)))
            .var_kwargs("kw"),
        |args| {
            Ok(Value::List(vec![
                Value::Tuple(args.rest().to_vec()),
                args.require("flag")?.clone(),
            ]))
        },
    );
    let module = fake_module(vec![function]);

    let result = module
        .call(
            "function",
            Args::new()
                .arg("Chris")
                .arg(5)
                .arg(1729)
                .kwarg("flag", true)
                .kwarg("height", 4),
        )
        .expect("call");

    assert_eq!(
        result,
        Value::List(vec![
            Value::Tuple(vec![Value::S64(5), Value::S64(1729)]),
            Value::Bool(true)
        ])
    );
}

#[test]
fn test_logbook_contains_entry_after_calling_wiretapped_function() {
    let logbook = wiretap_and_run(&fake_module(vec![]), "my_fun");
    assert!(!logbook.is_empty());
}

#[test]
fn test_logbook_entry_is_report_for_function() {
    let logbook = wiretap_and_run(&fake_module(vec![]), "my_fun");
    let report: CallReport = logbook.try_pop().expect("report");
    assert_eq!(report.function_name, "my_fun");
    assert!(report.function_args.is_empty());
    assert!(report.function_kwargs.is_empty());
    assert!(logbook.is_empty());
}

#[test]
fn test_wiretapped_function_returns_correct_return_value() {
    let module = fake_module(vec![Function::variadic("my_fun", |_| Ok(Value::S64(5)))]);
    let logbook = Logbook::new();
    wiretap_function(&module, "my_fun", logbook.clone()).expect("attach");

    assert_eq!(module.call("my_fun", Args::new()).expect("call"), Value::S64(5));
    assert_eq!(logbook.len(), 1);
}

#[test]
fn test_report_contains_args() {
    let my_fun = Function::new(
        "my_fun",
        Signature::new().param("name").param("height").param("reach"),
        |_| Ok(Value::Unit),
    );
    let module = fake_module(vec![my_fun]);
    let logbook = Logbook::new();
    wiretap_function(&module, "my_fun", logbook.clone()).expect("attach");

    let args: Args = [Value::from("Reyes"), Value::from(78), Value::from(205)]
        .into_iter()
        .collect();
    module.call("my_fun", args.clone()).expect("call");

    let report = logbook.try_pop().expect("report");
    assert_eq!(report.function_args, args.positional);
}

#[test]
fn test_report_contains_kwargs() {
    let my_fun = Function::new(
        "my_fun",
        Signature::new().param_default("flag", false),
        |_| Ok(Value::Unit),
    );
    let module = fake_module(vec![my_fun]);
    let logbook = Logbook::new();
    wiretap_function(&module, "my_fun", logbook.clone()).expect("attach");

    let args = Args::new().kwarg("flag", true);
    module.call("my_fun", args.clone()).expect("call");

    let report = logbook.try_pop().expect("report");
    assert_eq!(report.function_kwargs, args.keyword);
}

#[test]
fn test_sequential_calls_are_reported_in_order() {
    let module = fake_module(vec![Function::variadic("my_fun", |args| {
        Ok(args.rest().first().cloned().unwrap_or_default())
    })]);
    let logbook = Logbook::new();
    wiretap_function(&module, "my_fun", logbook.clone()).expect("attach");

    for i in 0..10 {
        assert_eq!(
            module.call("my_fun", Args::new().arg(i)).expect("call"),
            Value::S64(i)
        );
    }

    let reports = logbook.drain();
    assert_eq!(reports.len(), 10);
    for (i, report) in reports.iter().enumerate() {
        assert_eq!(report.function_args, vec![Value::S64(i as i64)]);
    }
    assert!(reports.windows(2).all(|w| w[0].sequence < w[1].sequence));
}

#[test]
fn test_raising_function_propagates_same_error_after_reporting() {
    let failing = Function::variadic("my_fun", |_| {
        Err(CallError::raise("ZeroDivisionError", "division by zero"))
    });
    let module = fake_module(vec![failing.clone()]);
    let logbook = Logbook::new();
    wiretap_function(&module, "my_fun", logbook.clone()).expect("attach");

    let unwrapped = failing.call(Args::new().arg(1)).unwrap_err();
    let wrapped = module.call("my_fun", Args::new().arg(1)).unwrap_err();
    assert_eq!(wrapped, unwrapped);
    assert_eq!(wrapped.to_string(), "ZeroDivisionError: division by zero");
    assert_eq!(logbook.len(), 1);
}

#[test]
fn test_binding_error_is_unchanged() {
    let my_fun = Function::new("my_fun", Signature::new().param("x"), |_| Ok(Value::Unit));
    let module = fake_module(vec![my_fun.clone()]);
    let logbook = Logbook::new();
    wiretap_function(&module, "my_fun", logbook.clone()).expect("attach");

    for args in [
        Args::new(),
        Args::new().arg(1).arg(2),
        Args::new().kwarg("y", 1),
        Args::new().arg(1).kwarg("x", 2),
    ] {
        let expected = my_fun.call(args.clone()).unwrap_err();
        assert_eq!(module.call("my_fun", args).unwrap_err(), expected);
    }
    assert_eq!(logbook.len(), 4);
}

#[test]
fn test_alias_taken_before_attach_is_not_intercepted() {
    let module = fake_module(vec![Function::variadic("my_fun", |_| Ok(Value::S64(5)))]);
    let alias = module.function("my_fun").expect("lookup");

    let logbook = Logbook::new();
    wiretap_function(&module, "my_fun", logbook.clone()).expect("attach");

    assert_eq!(alias.call(Args::new()).expect("call"), Value::S64(5));
    assert!(logbook.is_empty());

    module.call("my_fun", Args::new()).expect("call");
    assert_eq!(logbook.len(), 1);
}

#[test]
fn test_missing_member_is_attachment_error() {
    let module = fake_module(vec![]);
    let err = wiretap_function(&module, "not_there", Logbook::new()).unwrap_err();
    assert_eq!(
        err,
        WiretapError::MemberNotFound {
            owner: "FakeTestingModule".into(),
            member: "not_there".into()
        }
    );
    assert!(!module.has_attr("not_there"));
}

#[test]
fn test_function_stored_as_value_can_be_wiretapped() {
    let module = Namespace::new("m");
    module.set_attr(
        "callback",
        Attribute::Value(Value::Function(Function::variadic("cb", |_| Ok(Value::S64(1))))),
    );
    let logbook = Logbook::new();
    wiretap_function(&module, "callback", logbook.clone()).expect("attach");

    assert_eq!(module.call("callback", Args::new()).expect("call"), Value::S64(1));
    assert_eq!(logbook.try_pop().expect("report").function_name, "callback");
}

#[test]
fn test_channel_sink_receives_reports() {
    let module = fake_module(vec![]);
    let (tx, rx) = mpsc::channel();
    wiretap_function(&module, "my_fun", tx).expect("attach");

    module.call("my_fun", Args::new().arg("x")).expect("call");
    let report = rx.try_recv().expect("report");
    assert_eq!(report.function_args, vec![Value::from("x")]);
}
