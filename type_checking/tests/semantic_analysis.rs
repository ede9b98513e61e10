use ast::{json, Class, Expr, Feature, Located, Method, Program};
use compiler_shared::Context;
use serde_json::json;
use strtab::StringTable;
use type_checking::{analyze, check, CheckerOptions, Phase, WellKnownSymbols};

/// Lowers `$value`, runs `analyze` on it and evaluates `$body` with the
/// program, the context and the result of the analysis in scope.
macro_rules! analyze {
    ($value:expr, |$program:ident, $context:ident, $result:ident| $body:block) => {
        analyze!($value, CheckerOptions::default(), |$program, $context, $result| $body)
    };
    ($value:expr, $options:expr, |$program:ident, $context:ident, $result:ident| $body:block) => {{
        let raw: json::RawProgram = serde_json::from_value($value).expect("valid syntax tree");
        let mut strtab = StringTable::new();
        let $program = json::lower(&raw, "test.cl", &mut strtab);
        let symbols = WellKnownSymbols::new(&mut strtab);
        let $context = Context::dummy();
        let $result = analyze(&$program, symbols, &$context, &$options);
        $body
    }};
}

/// `(line, message)` of every reported error.
fn errors(value: serde_json::Value) -> Vec<(usize, String)> {
    analyze!(value, |_program, context, _result| {
        let errors = context
            .diagnostics
            .messages()
            .iter()
            .map(|msg| (msg.location.as_ref().map_or(0, |l| l.line), msg.message.clone()))
            .collect();
        errors
    })
}

fn main_with_body(body: serde_json::Value) -> serde_json::Value {
    json!({"classes": [{
        "name": "Main",
        "parent": "IO",
        "line": 1,
        "features": [
            {"method": {"name": "main", "return_type": "Object", "line": 2, "body": body}}
        ]
    }]})
}

fn only_messages(errors: Vec<(usize, String)>) -> Vec<String> {
    errors.into_iter().map(|(_, message)| message).collect()
}

#[test]
fn adding_a_string_to_an_int() {
    let program = main_with_body(json!({"plus": [{"int": 1}, {"string": "s"}], "line": 3}));
    analyze!(program, |program, context, result| {
        let analysis = result.expect("no hierarchy errors");
        let messages = context.diagnostics.messages();
        assert_eq!(1, messages.len());
        assert_eq!("non-Int arguments: Int + String", messages[0].message);
        assert_eq!(3, messages[0].location.as_ref().unwrap().line);

        let (_, main) = program.classes[0].methods().next().unwrap();
        let ty = analysis.types.expr_type(&main.body).unwrap();
        assert_eq!("Object", ty.as_str());
    });
}

#[test]
fn if_with_int_predicate_joins_branches() {
    let program = main_with_body(json!({"cond": {
        "pred": {"int": 3},
        "then": {"int": 1},
        "else": {"string": "x"}
    }}));
    analyze!(program, |program, context, result| {
        let analysis = result.expect("no hierarchy errors");
        assert_eq!(
            vec!["Predicate of 'if' does not have type Bool.".to_string()],
            context
                .diagnostics
                .messages()
                .iter()
                .map(|msg| msg.message.clone())
                .collect::<Vec<_>>()
        );
        let (_, main) = program.classes[0].methods().next().unwrap();
        assert_eq!("Object", analysis.types.expr_type(&main.body).unwrap().as_str());
    });
}

#[test]
fn redefined_inherited_attribute_keeps_its_type() {
    let program = json!({"classes": [
        {"name": "Main", "line": 1, "features": [
            {"attribute": {"name": "x", "type": "Int", "line": 2}}
        ]},
        {"name": "A", "parent": "Main", "line": 5, "features": [
            {"attribute": {"name": "x", "type": "String", "line": 6}},
            {"method": {"name": "f", "return_type": "Int", "line": 7, "body": {"object": "x"}}}
        ]}
    ]});
    analyze!(program, |program, context, result| {
        let analysis = result.expect("no hierarchy errors");
        let messages = context.diagnostics.messages();
        assert_eq!(1, messages.len());
        assert_eq!(
            "attribute x is already defined in the same class or a superclass.",
            messages[0].message
        );
        assert_eq!(6, messages[0].location.as_ref().unwrap().line);

        let (_, f) = program.classes[1].methods().next().unwrap();
        assert_eq!("Int", analysis.types.expr_type(&f.body).unwrap().as_str());
    });
}

#[test]
fn self_type_flows_through_dispatch() {
    let program = json!({"classes": [
        {"name": "Main", "parent": "IO", "features": [
            {"method": {"name": "main", "return_type": "Main",
                "body": {"dispatch": {"method": "out_string", "args": [{"string": "hi"}]}}}},
            {"method": {"name": "dup", "return_type": "A",
                "body": {"dispatch": {"receiver": {"new": "A"}, "method": "copy"}}}},
            {"method": {"name": "me", "return_type": "SELF_TYPE",
                "body": {"new": "SELF_TYPE"}}}
        ]},
        {"name": "A", "features": []}
    ]});
    analyze!(program, |program, context, result| {
        let analysis = result.expect("no hierarchy errors");
        assert!(
            !context.diagnostics.errored(),
            "{:?}",
            &*context.diagnostics.messages()
        );

        let types: Vec<_> = program.classes[0]
            .methods()
            .map(|(_, method)| analysis.types.expr_type(&method.body).unwrap().as_str())
            .collect();
        assert_eq!(vec!["SELF_TYPE", "A", "SELF_TYPE"], types);
    });
}

#[test]
fn every_reached_node_is_annotated() {
    let program = main_with_body(json!({"block": [
        {"let": {"name": "y", "type": "Int", "init": {"int": 1},
            "body": {"assign": {"name": "y", "value": {"mul": [{"object": "y"}, {"int": 2}]}}}}},
        {"loop": {"pred": {"lt": [{"int": 1}, {"int": 2}]}, "body": {"isvoid": {"new": "Object"}}}},
        {"not": {"eq": [{"string": "a"}, {"string": "b"}]}},
        {"neg": {"int": 4}}
    ]}));
    analyze!(program, |program, context, result| {
        let analysis = result.expect("no hierarchy errors");
        assert!(!context.diagnostics.errored());

        let (_, main) = program.classes[0].methods().next().unwrap();
        let mut nodes = 0;
        main.body.walk(&mut |node| {
            nodes += 1;
            assert!(analysis.types.expr_type(node).is_some(), "{:?}", node);
        });
        assert_eq!(nodes, analysis.types.len());
        assert_eq!("Int", analysis.types.expr_type(&main.body).unwrap().as_str());
    });
}

#[test]
fn running_twice_gives_the_same_result() {
    let program = json!({"classes": [
        {"name": "Main", "parent": "IO", "features": [
            {"attribute": {"name": "count", "type": "Int", "init": {"bool": true}}},
            {"method": {"name": "main", "return_type": "Object", "line": 3, "body": {"block": [
                {"object": "cuont"},
                {"dispatch": {"method": "out_int", "args": [{"string": "x"}]}},
                {"case": {"expr": {"int": 1}, "branches": [
                    {"name": "i", "type": "Int", "body": {"object": "i"}},
                    {"name": "s", "type": "String", "body": {"object": "s"}}
                ]}}
            ]}}}
        ]}
    ]});

    let first = errors(program.clone());
    let second = errors(program);
    assert_eq!(first, second);
    assert_eq!(
        vec![
            "Inferred type Bool of initialization of attribute count does not conform to declared type Int.",
            "Undeclared identifier cuont. Did you mean 'count'?",
            "In call of method out_int, type String of parameter arg does not conform to declared type Int.",
        ],
        only_messages(first)
    );
}

#[test]
fn case_branches() {
    let program = main_with_body(json!({"case": {"expr": {"int": 1}, "branches": [
        {"name": "a", "type": "Int", "body": {"int": 1}, "line": 4},
        {"name": "b", "type": "Int", "body": {"int": 2}, "line": 5},
        {"name": "self", "type": "Object", "body": {"int": 3}, "line": 6},
        {"name": "c", "type": "SELF_TYPE", "body": {"int": 4}, "line": 7},
        {"name": "d", "type": "Nope", "body": {"object": "d"}, "line": 8}
    ]}}));
    assert_eq!(
        vec![
            (5, "Duplicate branch Int in case statement.".to_string()),
            (6, "'self' bound in 'case'.".to_string()),
            (7, "Identifier c declared with type SELF_TYPE in case branch.".to_string()),
            (8, "Class Nope of case branch is undefined.".to_string()),
        ],
        errors(program)
    );
}

#[test]
fn case_result_is_the_join_of_its_branches() {
    let program = json!({"classes": [
        {"name": "Main", "features": [
            {"method": {"name": "main", "return_type": "Main", "body":
                {"case": {"expr": {"new": "B"}, "branches": [
                    {"name": "b", "type": "B", "body": {"new": "B"}},
                    {"name": "c", "type": "C", "body": {"new": "C"}}
                ]}}}}
        ]},
        {"name": "B", "parent": "Main", "features": []},
        {"name": "C", "parent": "Main", "features": []}
    ]});
    analyze!(program, |program, context, result| {
        let analysis = result.expect("no hierarchy errors");
        assert!(!context.diagnostics.errored());
        let (_, main) = program.classes[0].methods().next().unwrap();
        assert_eq!("Main", analysis.types.expr_type(&main.body).unwrap().as_str());
    });
}

#[test]
fn let_bindings() {
    let program = main_with_body(json!({"block": [
        {"let": {"name": "self", "type": "Int", "body": {"int": 1}}, "line": 3},
        {"let": {"name": "x", "type": "Nope", "body": {"int": 1}}, "line": 4},
        {"let": {"name": "y", "type": "Int", "init": {"string": "s"}, "body": {"int": 1}}, "line": 5},
        {"let": {"name": "z", "type": "Int", "init": {"object": "z"}, "body": {"object": "z"}}, "line": 6}
    ]}));
    assert_eq!(
        vec![
            (3, "'self' cannot be bound in a 'let' expression.".to_string()),
            (4, "Class Nope of let-bound identifier x is undefined.".to_string()),
            (
                5,
                "Inferred type String of initialization of y does not conform to identifier's declared type Int."
                    .to_string()
            ),
            (6, "Undeclared identifier z.".to_string()),
            (
                6,
                "Inferred type Object of initialization of z does not conform to identifier's declared type Int."
                    .to_string()
            ),
        ],
        errors(program)
    );
}

#[test]
fn assignments() {
    let program = json!({"classes": [{"name": "Main", "features": [
        {"attribute": {"name": "x", "type": "Int"}},
        {"method": {"name": "main", "return_type": "Object", "line": 2, "body": {"block": [
            {"assign": {"name": "self", "value": {"int": 1}}, "line": 3},
            {"assign": {"name": "x", "value": {"bool": false}}, "line": 4},
            {"assign": {"name": "w", "value": {"int": 1}}, "line": 5},
            {"assign": {"name": "x", "value": {"int": 1}}, "line": 6}
        ]}}}
    ]}]});
    assert_eq!(
        vec![
            (3, "Cannot assign to 'self'.".to_string()),
            (
                4,
                "Type Bool of assigned expression does not conform to declared type Int of identifier x."
                    .to_string()
            ),
            (5, "Assignment to undeclared variable w. Did you mean 'x'?".to_string()),
        ],
        errors(program)
    );
}

#[test]
fn dispatch_errors() {
    let program = main_with_body(json!({"block": [
        {"dispatch": {"method": "nope"}, "line": 3},
        {"dispatch": {"method": "out_int", "args": []}, "line": 4},
        {"static_dispatch": {"type": "SELF_TYPE", "method": "abort"}, "line": 5},
        {"static_dispatch": {"type": "Nope", "method": "abort"}, "line": 6},
        {"static_dispatch": {"receiver": {"int": 1}, "type": "String", "method": "length"}, "line": 7}
    ]}));
    assert_eq!(
        vec![
            (3, "Dispatch to undefined method nope.".to_string()),
            (
                4,
                "Method out_int called with wrong number of arguments (expected 1, got 0)."
                    .to_string()
            ),
            (5, "Static dispatch to SELF_TYPE.".to_string()),
            (6, "Static dispatch to undefined class Nope.".to_string()),
            (
                7,
                "Expression type Int does not conform to declared static dispatch type String."
                    .to_string()
            ),
        ],
        errors(program)
    );
}

#[test]
fn comparisons_and_unary_operators() {
    let program = main_with_body(json!({"block": [
        {"eq": [{"int": 1}, {"string": "1"}], "line": 3},
        {"eq": [{"new": "IO"}, {"new": "Object"}], "line": 4},
        {"leq": [{"bool": true}, {"int": 1}], "line": 5},
        {"neg": {"bool": true}, "line": 6},
        {"not": {"int": 1}, "line": 7},
        {"new": "Nope", "line": 8},
        {"loop": {"pred": {"int": 1}, "body": {"no_expr": null}}, "line": 9}
    ]}));
    assert_eq!(
        vec![
            (3, "Illegal comparison with a basic type.".to_string()),
            (5, "non-Int arguments: Bool <= Int".to_string()),
            (6, "Argument of '~' has type Bool instead of Int.".to_string()),
            (7, "Argument of 'not' has type Int instead of Bool.".to_string()),
            (8, "'new' used with undefined class Nope.".to_string()),
            (9, "Loop condition does not have type Bool.".to_string()),
        ],
        errors(program)
    );
}

#[test]
fn feature_declarations() {
    let program = json!({"classes": [{"name": "Main", "features": [
        {"attribute": {"name": "self", "type": "Int", "line": 2}},
        {"attribute": {"name": "a", "type": "Nope", "line": 3}},
        {"method": {"name": "f", "line": 4, "return_type": "Int",
            "formals": [
                {"name": "x", "type": "Int"},
                {"name": "x", "type": "Int"},
                {"name": "self", "type": "Int"},
                {"name": "y", "type": "SELF_TYPE"},
                {"name": "z", "type": "Nope"}
            ],
            "body": {"object": "x"}}},
        {"method": {"name": "g", "line": 5, "return_type": "Nope", "body": {"int": 1}}},
        {"method": {"name": "h", "line": 6, "return_type": "String", "body": {"int": 1}}},
        {"method": {"name": "h", "line": 7, "return_type": "Int", "body": {"int": 1}}}
    ]}]});
    assert_eq!(
        vec![
            (7, "Method h is multiply defined.".to_string()),
            (2, "'self' cannot be the name of an attribute.".to_string()),
            (3, "Class Nope of attribute a is undefined.".to_string()),
            (4, "Formal parameter x is multiply defined.".to_string()),
            (4, "'self' cannot be the name of a formal parameter.".to_string()),
            (4, "Formal parameter y cannot have type SELF_TYPE.".to_string()),
            (4, "Class Nope of formal parameter z is undefined.".to_string()),
            (5, "Undefined return type Nope in method g.".to_string()),
            (
                6,
                "Inferred return type Int of method h does not conform to declared return type String."
                    .to_string()
            ),
        ],
        errors(program)
    );
}

#[test]
fn nesting_limit_cuts_the_tree() {
    let program = main_with_body(json!({
        "isvoid": {"isvoid": {"isvoid": {"isvoid": {"int": 1}}}},
        "line": 3
    }));
    let options = CheckerOptions {
        max_nesting_depth: 2,
    };
    analyze!(program, options, |program, context, result| {
        let analysis = result.expect("no hierarchy errors");
        assert_eq!(
            vec!["expression nesting exceeds the limit of 2 levels.".to_string()],
            context
                .diagnostics
                .messages()
                .iter()
                .map(|msg| msg.message.clone())
                .collect::<Vec<_>>()
        );

        let (_, main) = program.classes[0].methods().next().unwrap();
        let mut annotated = Vec::new();
        main.body.walk(&mut |node| annotated.push(analysis.types.expr_type(node).is_some()));
        assert_eq!(vec![true, true, true, false, false], annotated);

        let cut = match &main.body.data {
            Expr::IsVoid(inner) => match &inner.data {
                Expr::IsVoid(cut) => cut,
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!("Object", analysis.types.expr_type(cut).unwrap().as_str());
    });
}

#[test]
fn default_nesting_limit_is_reported_not_overflowed() {
    let limit = CheckerOptions::default().max_nesting_depth;
    let mut strtab = StringTable::new();
    let symbols = WellKnownSymbols::new(&mut strtab);

    // built directly, the JSON reader is not what is exercised here
    let mut body = Located::new(3, Expr::IntConst(1));
    for _ in 0..=limit {
        body = Located::new(3, Expr::IsVoid(Box::new(body)));
    }
    let main = Method {
        name: strtab.intern("main"),
        formals: Vec::new(),
        return_type: symbols.object,
        body: Box::new(body),
    };
    let program = Program {
        classes: vec![Located::new(
            1,
            Class {
                name: symbols.main_class,
                parent: symbols.object,
                filename: strtab.intern("deep.cl"),
                features: vec![Located::new(2, Feature::Method(main))],
            },
        )],
    };

    let context = Context::dummy();
    let analysis = analyze(&program, symbols, &context, &CheckerOptions::default())
        .expect("no hierarchy errors");
    assert_eq!(
        vec![format!("expression nesting exceeds the limit of {} levels.", limit)],
        context
            .diagnostics
            .messages()
            .iter()
            .map(|msg| msg.message.clone())
            .collect::<Vec<_>>()
    );
    assert_eq!(limit + 1, analysis.types.len());
}

#[test]
fn conditions_are_reported_at_the_expression() {
    let program = main_with_body(json!({"block": [
        {"cond": {
            "pred": {"int": 1, "line": 4},
            "then": {"int": 1},
            "else": {"int": 2}
        }, "line": 3},
        {"loop": {"pred": {"string": "s", "line": 6}, "body": {"int": 1}}, "line": 5}
    ]}));
    assert_eq!(
        vec![
            (3, "Predicate of 'if' does not have type Bool.".to_string()),
            (5, "Loop condition does not have type Bool.".to_string()),
        ],
        errors(program)
    );
}

#[test]
fn hierarchy_errors_stop_before_type_checking() {
    let program = json!({"classes": [
        {"name": "Main", "line": 1, "features": [
            {"method": {"name": "main", "return_type": "Int", "body": {"string": "wrong"}}}
        ]},
        {"name": "A", "parent": "B", "line": 4, "features": []},
        {"name": "B", "parent": "A", "line": 7, "features": []}
    ]});
    analyze!(program, |_program, context, result| {
        let halt = result.unwrap_err();
        assert_eq!(Phase::Hierarchy, halt.phase);
        let messages = context.diagnostics.messages();
        assert_eq!(1, messages.len());
        assert_eq!(
            "class B, or an ancestor of B, is involved in an inheritance cycle.",
            messages[0].message
        );
        assert_eq!(7, messages[0].location.as_ref().unwrap().line);
    });
}

#[test]
fn check_fails_on_type_errors() {
    let raw: json::RawProgram =
        serde_json::from_value(main_with_body(json!({"not": {"int": 1}}))).unwrap();
    let mut strtab = StringTable::new();
    let program = json::lower(&raw, "test.cl", &mut strtab);
    let symbols = WellKnownSymbols::new(&mut strtab);
    let context = Context::dummy();

    let halt = check(&program, symbols, &context, &CheckerOptions::default()).unwrap_err();
    assert_eq!(Phase::TypeChecking, halt.phase);
    assert_eq!(1, halt.errors);
    assert_eq!("type checking failed with 1 error(s)", halt.to_string());
}
