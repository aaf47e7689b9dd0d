/**
 * Script parser tests
 *
 * Statement and expression coverage for the JavaScript-subset parser,
 * including recovery and semicolon insertion.
 */

#[cfg(test)]
mod tests {
    use a11y_analyzer::script::ast::*;
    use a11y_analyzer::script::{ParseResult, Parser};

    fn parse(source: &str) -> ParseResult {
        Parser::new().parse(source, "test.js")
    }

    fn parse_ok(source: &str) -> Program {
        let result = parse(source);
        assert!(
            result.errors.is_empty(),
            "unexpected errors: {:?}",
            result.errors
        );
        result.program
    }

    mod declarations {
        use super::*;

        #[test]
        fn should_parse_multiple_declarators() {
            let program = parse_ok("let a = 1, b = 2;");
            let Stmt::VarDecl(decl) = &program.body[0] else {
                panic!("expected var decl");
            };
            assert_eq!(decl.kind, VarKind::Let);
            assert_eq!(decl.declarators.len(), 2);
            assert_eq!(decl.declarators[0].name, "a");
            assert_eq!(decl.declarators[1].name, "b");
            assert!(decl.declarators[1].init.is_some());
        }

        #[test]
        fn should_parse_const_without_initializer_list() {
            let program = parse_ok("const answer = 42;");
            let Stmt::VarDecl(decl) = &program.body[0] else {
                panic!("expected var decl");
            };
            assert_eq!(decl.kind, VarKind::Const);
            assert_eq!(decl.declarators.len(), 1);
        }

        #[test]
        fn should_parse_function_declarations() {
            let program = parse_ok("function add(a, b = 1) { return a + b; }");
            let Stmt::FunctionDecl(function) = &program.body[0] else {
                panic!("expected function decl");
            };
            assert_eq!(function.name.as_deref(), Some("add"));
            assert_eq!(function.params.len(), 2);
            assert!(function.params[1].default.is_some());
            assert_eq!(function.body.len(), 1);
        }

        #[test]
        fn should_parse_class_declarations() {
            let program = parse_ok(
                "class Widget extends Base { constructor(el) { this.el = el; } open() { return 1; } static of(el) { return new Widget(el); } }",
            );
            let Stmt::ClassDecl(class) = &program.body[0] else {
                panic!("expected class decl");
            };
            assert_eq!(class.name.as_deref(), Some("Widget"));
            assert!(class.superclass.is_some());
            assert_eq!(class.methods.len(), 3);
            assert!(class.methods[2].is_static);
        }
    }

    mod control_flow {
        use super::*;

        #[test]
        fn should_parse_if_else_chains() {
            let program = parse_ok("if (a) { b(); } else if (c) { d(); } else { e(); }");
            let Stmt::If(stmt) = &program.body[0] else { panic!("expected if") };
            assert!(stmt.alternate.is_some());
            let Stmt::If(nested) = stmt.alternate.as_deref().unwrap() else {
                panic!("expected nested if in else");
            };
            assert!(nested.alternate.is_some());
        }

        #[test]
        fn should_parse_classic_for() {
            let program = parse_ok("for (let i = 0; i < 10; i++) { work(i); }");
            let Stmt::For(stmt) = &program.body[0] else { panic!("expected for") };
            assert!(stmt.init.is_some());
            assert!(stmt.test.is_some());
            assert!(stmt.update.is_some());
        }

        #[test]
        fn should_parse_for_in_and_for_of() {
            let program = parse_ok("for (const k in map) {}\nfor (const v of list) {}");
            assert!(matches!(&program.body[0], Stmt::ForIn(each) if each.variable == "k"));
            assert!(matches!(&program.body[1], Stmt::ForOf(each) if each.variable == "v"));
        }

        #[test]
        fn should_parse_switch_with_default() {
            let program = parse_ok(
                "switch (x) { case 1: one(); break; case 2: two(); break; default: rest(); }",
            );
            let Stmt::Switch(stmt) = &program.body[0] else { panic!("expected switch") };
            assert_eq!(stmt.cases.len(), 3);
            assert!(stmt.cases[2].test.is_none());
        }

        #[test]
        fn should_parse_try_catch_finally() {
            let program = parse_ok("try { risky(); } catch (err) { log(err); } finally { done(); }");
            let Stmt::Try(stmt) = &program.body[0] else { panic!("expected try") };
            assert_eq!(stmt.handler.as_ref().unwrap().param.as_deref(), Some("err"));
            assert!(stmt.finalizer.is_some());
        }

        #[test]
        fn should_parse_do_while() {
            let program = parse_ok("do { step(); } while (more());");
            assert!(matches!(&program.body[0], Stmt::DoWhile(_)));
        }
    }

    mod expressions {
        use super::*;

        fn first_expr(program: &Program) -> &Expr {
            match &program.body[0] {
                Stmt::Expr(stmt) => &stmt.expr,
                other => panic!("expected expression statement, got {:?}", other),
            }
        }

        #[test]
        fn should_parse_member_call_chains() {
            let program = parse_ok("document.getElementById('x').addEventListener('click', fn);");
            let expr = first_expr(&program);
            let Expr::Call(call) = expr else { panic!("expected call") };
            assert_eq!(call.args.len(), 2);
            assert_eq!(
                dotted_path(&call.callee).as_deref(),
                Some("document.getElementById.addEventListener")
            );
        }

        #[test]
        fn should_parse_single_param_arrows() {
            let program = parse_ok("list.map(x => x * 2);");
            let Expr::Call(call) = first_expr(&program) else { panic!("expected call") };
            let Expr::Function(arrow) = &call.args[0] else { panic!("expected arrow") };
            assert!(arrow.is_arrow);
            assert!(arrow.expression_body.is_some());
            assert_eq!(arrow.params[0].name, "x");
        }

        #[test]
        fn should_parse_parenthesized_arrows_with_bodies() {
            let program = parse_ok("const f = (a, b) => { return a + b; };");
            let Stmt::VarDecl(decl) = &program.body[0] else { panic!("expected decl") };
            let Some(Expr::Function(arrow)) = &decl.declarators[0].init else {
                panic!("expected arrow initializer");
            };
            assert!(arrow.is_arrow);
            assert_eq!(arrow.params.len(), 2);
            assert!(arrow.expression_body.is_none());
            assert_eq!(arrow.body.len(), 1);
        }

        #[test]
        fn should_parse_conditional_and_logical_operators() {
            let program = parse_ok("const v = a && b ? c ?? d : !e;");
            let Stmt::VarDecl(decl) = &program.body[0] else { panic!("expected decl") };
            assert!(matches!(
                decl.declarators[0].init,
                Some(Expr::Conditional(_))
            ));
        }

        #[test]
        fn should_parse_object_and_array_literals() {
            let program = parse_ok("const o = { a: 1, b, c() { return 2; }, ...rest };");
            let Stmt::VarDecl(decl) = &program.body[0] else { panic!("expected decl") };
            let Some(Expr::ObjectLit(object)) = &decl.declarators[0].init else {
                panic!("expected object literal");
            };
            assert_eq!(object.members.len(), 4);
            assert!(matches!(&object.members[3], ObjectMember::Spread(_)));

            let program = parse_ok("const a = [1, 'two', [3]];");
            let Stmt::VarDecl(decl) = &program.body[0] else { panic!("expected decl") };
            let Some(Expr::ArrayLit(array)) = &decl.declarators[0].init else {
                panic!("expected array literal");
            };
            assert_eq!(array.elements.len(), 3);
        }

        #[test]
        fn should_parse_template_literals() {
            let program = parse_ok("const s = `hello ${name}, you have ${count} items`;");
            let Stmt::VarDecl(decl) = &program.body[0] else { panic!("expected decl") };
            let Some(Expr::Template(template)) = &decl.declarators[0].init else {
                panic!("expected template literal");
            };
            assert_eq!(template.exprs.len(), 2);
            assert_eq!(template.quasis.len(), 3);
            assert_eq!(template.quasis[0], "hello ");
        }

        #[test]
        fn should_parse_optional_chaining() {
            let program = parse_ok("const v = el?.dataset?.label;");
            let Stmt::VarDecl(decl) = &program.body[0] else { panic!("expected decl") };
            let Some(Expr::Member(member)) = &decl.declarators[0].init else {
                panic!("expected member");
            };
            assert!(member.optional);
        }

        #[test]
        fn should_parse_update_expressions() {
            let program = parse_ok("i++; --j;");
            assert!(matches!(
                first_expr(&program),
                Expr::Update(update) if !update.prefix
            ));
            let Stmt::Expr(second) = &program.body[1] else { panic!("expected expr") };
            assert!(matches!(&second.expr, Expr::Update(update) if update.prefix));
        }
    }

    mod modules {
        use super::*;

        #[test]
        fn should_parse_imports() {
            let program = parse_ok("import def, { a, b as c } from 'mod';\nimport 'side-effect';");
            let Stmt::Import(import) = &program.body[0] else { panic!("expected import") };
            assert_eq!(import.default_name.as_deref(), Some("def"));
            assert_eq!(import.named, vec!["a".to_string(), "c".to_string()]);
            assert_eq!(import.source, "mod");
            let Stmt::Import(bare) = &program.body[1] else { panic!("expected import") };
            assert_eq!(bare.source, "side-effect");
        }

        #[test]
        fn should_parse_exports() {
            let program = parse_ok("export default function init() {}\nexport const k = 1;");
            assert!(matches!(&program.body[0], Stmt::Export(e) if e.is_default));
            assert!(matches!(&program.body[1], Stmt::Export(e) if !e.is_default));
        }
    }

    mod recovery {
        use super::*;

        #[test]
        fn should_recover_at_statement_boundaries() {
            let result = parse("let = 5; follow();");
            assert!(!result.errors.is_empty());
            assert!(result
                .program
                .body
                .iter()
                .any(|stmt| matches!(stmt, Stmt::Expr(_))));
        }

        #[test]
        fn should_insert_semicolons_after_return() {
            let program = parse_ok("function f() { return\n1 }");
            let Stmt::FunctionDecl(function) = &program.body[0] else {
                panic!("expected function");
            };
            let Stmt::Return(ret) = &function.body[0] else { panic!("expected return") };
            assert!(ret.argument.is_none());
            assert_eq!(function.body.len(), 2);
        }

        #[test]
        fn should_keep_parsing_after_unknown_characters() {
            let result = parse("ok(); @; again();");
            assert!(!result.errors.is_empty());
            assert!(result.program.body.len() >= 2);
        }
    }
}
