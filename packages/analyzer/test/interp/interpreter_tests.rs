/**
 * Interpreter tests
 *
 * Evaluation semantics over lowered trees: scoping, control flow,
 * operators, host objects, safety caps and the deterministic mock DOM.
 */

#[cfg(test)]
mod tests {
    use a11y_analyzer::action::{lower_program, ActionTree};
    use a11y_analyzer::config::AnalyzerConfig;
    use a11y_analyzer::engine::CancellationToken;
    use a11y_analyzer::error::{EngineError, InterpreterError};
    use a11y_analyzer::interp::{DomEffect, Interpreter, TimerKind};
    use a11y_analyzer::parse_util::SourceFile;
    use a11y_analyzer::script::Parser;

    fn lower(source: &str) -> ActionTree {
        let result = Parser::new().parse(source, "test.js");
        assert!(result.errors.is_empty(), "parse errors: {:?}", result.errors);
        let file = SourceFile::new("test.js", source);
        lower_program(&result.program, file)
    }

    fn run(source: &str) -> Interpreter {
        run_with(source, AnalyzerConfig::default())
    }

    fn run_with(source: &str, config: AnalyzerConfig) -> Interpreter {
        let tree = lower(source);
        let mut interp = Interpreter::new(&config, CancellationToken::new());
        interp.run(&tree).expect("evaluation should succeed");
        interp
    }

    fn logged(source: &str) -> Vec<String> {
        run(source).console_output().to_vec()
    }

    mod basics {
        use super::*;

        #[test]
        fn should_evaluate_arithmetic_and_strings() {
            assert_eq!(logged("console.log(1 + 2 * 3);"), vec!["7"]);
            assert_eq!(logged("console.log('a' + 1);"), vec!["a1"]);
            assert_eq!(logged("console.log(10 % 3, 2 ** 3);"), vec!["1 8"]);
            assert_eq!(logged("console.log(7 / 2);"), vec!["3.5"]);
        }

        #[test]
        fn should_apply_equality_rules() {
            assert_eq!(
                logged("console.log(1 == '1', 1 === '1', null == undefined, null === undefined);"),
                vec!["true false true false"]
            );
        }

        #[test]
        fn should_short_circuit_logical_operators() {
            assert_eq!(
                logged("console.log(false && boom(), true || boom(), null ?? 'fallback');"),
                vec!["false true fallback"]
            );
        }

        #[test]
        fn should_evaluate_template_literals() {
            assert_eq!(
                logged("const n = 3; console.log(`n is ${n}, twice ${n * 2}`);"),
                vec!["n is 3, twice 6"]
            );
        }

        #[test]
        fn should_handle_update_operators() {
            assert_eq!(
                logged("let a = 5; console.log(a++, a, ++a);"),
                vec!["5 6 7"]
            );
        }

        #[test]
        fn should_report_typeof_for_unbound_names() {
            assert_eq!(
                logged("console.log(typeof missing, typeof 1, typeof 'x', typeof {});"),
                vec!["undefined number string object"]
            );
        }
    }

    mod scoping {
        use super::*;

        #[test]
        fn should_capture_closures() {
            let output = logged(
                "function counter() { let n = 0; return function() { n++; return n; }; }\n\
                 const next = counter();\n\
                 console.log(next());\n\
                 console.log(next());",
            );
            assert_eq!(output, vec!["1", "2"]);
        }

        #[test]
        fn should_hoist_function_declarations() {
            assert_eq!(logged("console.log(late()); function late() { return 'ok'; }"), vec!["ok"]);
        }

        #[test]
        fn should_shadow_in_blocks() {
            assert_eq!(
                logged("let x = 'outer'; { let x = 'inner'; console.log(x); } console.log(x);"),
                vec!["inner", "outer"]
            );
        }

        #[test]
        fn should_apply_default_parameters() {
            assert_eq!(
                logged("function f(a, b = 10) { return a + b; } console.log(f(1), f(1, 2));"),
                vec!["11 3"]
            );
        }
    }

    mod control_flow {
        use super::*;

        #[test]
        fn should_run_loops_with_break_and_continue() {
            let output = logged(
                "let sum = 0;\n\
                 for (let i = 0; i < 10; i++) { if (i % 2 === 1) { continue; } if (i > 6) { break; } sum += i; }\n\
                 console.log(sum);",
            );
            assert_eq!(output, vec!["12"]); // 0 + 2 + 4 + 6
        }

        #[test]
        fn should_iterate_for_of_and_for_in() {
            assert_eq!(
                logged("let out = ''; for (const c of ['a', 'b']) { out += c; } console.log(out);"),
                vec!["ab"]
            );
            assert_eq!(
                logged("let keys = ''; const o = { x: 1, y: 2 }; for (const k in o) { keys += k; } console.log(keys);"),
                vec!["xy"]
            );
        }

        #[test]
        fn should_fall_through_switch_cases() {
            let output = logged(
                "let x = 2; let out = '';\n\
                 switch (x) { case 1: out += 'a'; case 2: out += 'b'; case 3: out += 'c'; break; default: out += 'd'; }\n\
                 console.log(out);",
            );
            assert_eq!(output, vec!["bc"]);
        }

        #[test]
        fn should_catch_thrown_values() {
            assert_eq!(
                logged("try { throw 'boom'; } catch (e) { console.log('caught', e); } finally { console.log('done'); }"),
                vec!["caught boom", "done"]
            );
        }

        #[test]
        fn should_propagate_uncaught_throws_as_errors() {
            let tree = lower("throw 'unhandled';");
            let config = AnalyzerConfig::default();
            let mut interp = Interpreter::new(&config, CancellationToken::new());
            let result = interp.run(&tree);
            assert!(matches!(
                result,
                Err(EngineError::Interpreter(InterpreterError::UncaughtThrow { .. }))
            ));
        }
    }

    mod host {
        use super::*;

        #[test]
        fn should_expose_math_and_number_helpers() {
            assert_eq!(
                logged("console.log(Math.max(1, 9, 4), Math.abs(-2), Math.floor(2.9));"),
                vec!["9 2 2"]
            );
            assert_eq!(
                logged("console.log(parseInt('42px'), parseFloat('2.5rem'), isNaN('x'));"),
                vec!["42 2.5 true"]
            );
        }

        #[test]
        fn should_support_string_methods() {
            assert_eq!(
                logged("console.log('Hello World'.toUpperCase().indexOf('WORLD'));"),
                vec!["6"]
            );
            assert_eq!(
                logged("console.log(' pad '.trim(), 'a-b-c'.split('-').length);"),
                vec!["pad 3"]
            );
        }

        #[test]
        fn should_support_array_methods_with_callbacks() {
            assert_eq!(
                logged("console.log([1, 2, 3].map(x => x * 2).filter(x => x > 2).join('+'));"),
                vec!["4+6"]
            );
            assert_eq!(
                logged("console.log([3, 1, 2].sort().join(''), [1, 2, 3].reduce((a, b) => a + b, 0));"),
                vec!["123 6"]
            );
        }

        #[test]
        fn should_round_trip_json() {
            assert_eq!(
                logged("console.log(JSON.stringify({ a: 1, b: [true, null] }));"),
                vec!["{\"a\":1,\"b\":[true,null]}"]
            );
            assert_eq!(
                logged("console.log(JSON.parse('{\"k\":5}').k);"),
                vec!["5"]
            );
        }

        #[test]
        fn should_pass_await_through_unchanged() {
            assert_eq!(logged("async function f() { return await 5; } console.log(1);"), vec!["1"]);
            assert_eq!(logged("console.log(typeof Object.keys({ a: 1 }));"), vec!["object"]);
        }
    }

    mod safety {
        use super::*;

        #[test]
        fn should_enforce_the_iteration_cap() {
            let tree = lower("while (true) { }");
            let config = AnalyzerConfig {
                max_iterations: 50,
                ..AnalyzerConfig::default()
            };
            let mut interp = Interpreter::new(&config, CancellationToken::new());
            assert!(matches!(
                interp.run(&tree),
                Err(EngineError::Interpreter(InterpreterError::IterationLimit { limit: 50 }))
            ));
        }

        #[test]
        fn should_enforce_the_call_depth_cap() {
            let tree = lower("function recurse() { return recurse(); } recurse();");
            let config = AnalyzerConfig {
                max_call_depth: 25,
                ..AnalyzerConfig::default()
            };
            let mut interp = Interpreter::new(&config, CancellationToken::new());
            assert!(matches!(
                interp.run(&tree),
                Err(EngineError::Interpreter(InterpreterError::CallDepth { limit: 25 }))
            ));
        }

        #[test]
        fn should_stop_on_cancellation() {
            let tree = lower("while (true) { }");
            let config = AnalyzerConfig::default();
            let cancel = CancellationToken::new();
            cancel.cancel();
            let mut interp = Interpreter::new(&config, cancel);
            assert!(matches!(
                interp.run(&tree),
                Err(EngineError::Interpreter(InterpreterError::Cancelled))
            ));
        }

        #[test]
        fn should_warn_instead_of_crashing_on_unknown_names() {
            let interp = run("mysteryFn();");
            assert!(!interp.warnings().is_empty());
        }
    }

    mod determinism {
        use super::*;

        #[test]
        fn should_produce_identical_output_across_runs() {
            let source = "for (let i = 0; i < 3; i++) { console.log(i, Math.random()); }";
            let first = logged(source);
            let second = logged(source);
            assert_eq!(first, second);
        }
    }

    mod dom_simulation {
        use super::*;

        #[test]
        fn should_return_the_same_element_for_the_same_id() {
            let output = logged(
                "const a = document.getElementById('x');\n\
                 const b = document.getElementById('x');\n\
                 console.log(a === b);",
            );
            assert_eq!(output, vec!["true"]);
        }

        #[test]
        fn should_record_attribute_and_focus_effects() {
            let interp = run(
                "const el = document.getElementById('save');\n\
                 el.setAttribute('aria-expanded', 'true');\n\
                 el.focus();",
            );
            let effects = interp.effects();
            assert!(effects.iter().any(|e| matches!(
                e,
                DomEffect::SetAttribute { target, name, value }
                    if target == "#save" && name == "aria-expanded" && value == "true"
            )));
            assert!(effects
                .iter()
                .any(|e| matches!(e, DomEffect::Focus { target } if target == "#save")));
        }

        #[test]
        fn should_read_back_written_attributes() {
            assert_eq!(
                logged(
                    "const el = document.createElement('div');\n\
                     el.setAttribute('role', 'button');\n\
                     console.log(el.getAttribute('role'), el.getAttribute('missing'));"
                ),
                vec!["button null"]
            );
        }

        #[test]
        fn should_record_timers_without_firing_them() {
            let interp = run("setTimeout(() => console.log('never'), 3000); setInterval(tick, 50);");
            assert!(interp.console_output().is_empty());
            let timers = interp.timers();
            assert_eq!(timers.len(), 2);
            assert_eq!(timers[0].kind, TimerKind::Timeout);
            assert_eq!(timers[0].delay_ms, 3000.0);
            assert_eq!(timers[1].kind, TimerKind::Interval);
        }

        #[test]
        fn should_track_cleared_timers() {
            let interp = run("const id = setInterval(tick, 100); clearInterval(id);");
            assert_eq!(interp.cancelled_timers(), &[1]);
        }

        #[test]
        fn should_record_navigation_effects() {
            let interp = run("window.location = '/next';");
            assert!(interp
                .effects()
                .iter()
                .any(|e| matches!(e, DomEffect::Navigate { url } if url == "/next")));
        }

        #[test]
        fn should_support_instanceof_against_host_types() {
            assert_eq!(
                logged("const el = document.createElement('span'); console.log(el instanceof HTMLElement, ({}) instanceof Element);"),
                vec!["true false"]
            );
        }
    }
}
