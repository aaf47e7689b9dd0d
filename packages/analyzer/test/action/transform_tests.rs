/**
 * AST transformer tests
 *
 * Lowering shapes: kinds, child roles, attributes, call pattern tagging
 * and the registered tree invariants.
 */

#[cfg(test)]
mod tests {
    use a11y_analyzer::action::{lower_program, ActionKind, ActionTree, ChildRole};
    use a11y_analyzer::parse_util::SourceFile;
    use a11y_analyzer::script::Parser;

    fn lower(source: &str) -> ActionTree {
        let result = Parser::new().parse(source, "test.js");
        assert!(
            result.errors.is_empty(),
            "unexpected parse errors: {:?}",
            result.errors
        );
        let file = SourceFile::new("test.js", source);
        lower_program(&result.program, file)
    }

    mod structure {
        use super::*;

        #[test]
        fn should_root_at_program() {
            let tree = lower("work();");
            assert_eq!(tree.root.kind, ActionKind::Program);
            assert_eq!(tree.root.children.len(), 1);
        }

        #[test]
        fn should_lower_multiple_declarators_to_seq() {
            let tree = lower("let a = 1, b = 2;");
            let seq = &tree.root.children[0].node;
            assert_eq!(seq.kind, ActionKind::Seq);
            assert_eq!(seq.children.len(), 2);
            assert_eq!(seq.children[0].node.kind, ActionKind::DeclareVar);
            assert_eq!(seq.children[0].node.attr_str("name"), Some("a"));
            assert_eq!(seq.children[1].node.attr_str("name"), Some("b"));
        }

        #[test]
        fn should_lower_single_declarator_bare() {
            let tree = lower("const answer = 42;");
            let decl = &tree.root.children[0].node;
            assert_eq!(decl.kind, ActionKind::DeclareConst);
            assert_eq!(decl.attr_str("name"), Some("answer"));
            let init = decl.child_by_role(ChildRole::Init).expect("init child");
            assert_eq!(init.kind, ActionKind::Literal);
            assert_eq!(init.attr_int("value"), Some(42));
        }

        #[test]
        fn should_attach_if_children_by_role() {
            let tree = lower("if (ready) { go(); } else { wait(); }");
            let if_action = &tree.root.children[0].node;
            assert_eq!(if_action.kind, ActionKind::If);
            assert!(if_action.child_by_role(ChildRole::Condition).is_some());
            assert!(if_action.child_by_role(ChildRole::Then).is_some());
            assert!(if_action.child_by_role(ChildRole::Else).is_some());
        }

        #[test]
        fn should_attach_for_children_by_role() {
            let tree = lower("for (let i = 0; i < 3; i++) { use(i); }");
            let for_action = &tree.root.children[0].node;
            assert_eq!(for_action.kind, ActionKind::For);
            for role in [ChildRole::Init, ChildRole::Test, ChildRole::Update, ChildRole::Body] {
                assert!(for_action.child_by_role(role).is_some(), "missing {:?}", role);
            }
        }

        #[test]
        fn should_lower_for_of_with_variable_and_iterable() {
            let tree = lower("for (const item of items) { use(item); }");
            let action = &tree.root.children[0].node;
            assert_eq!(action.kind, ActionKind::ForOf);
            let variable = action.child_by_role(ChildRole::Variable).expect("variable");
            assert_eq!(variable.attr_str("name"), Some("item"));
            assert!(action.child_by_role(ChildRole::Iterable).is_some());
        }

        #[test]
        fn should_lower_functions_with_params_and_body() {
            let tree = lower("function greet(name) { return name; }");
            let func = &tree.root.children[0].node;
            assert_eq!(func.kind, ActionKind::DeclareFunction);
            assert_eq!(func.attr_str("name"), Some("greet"));
            let params: Vec<_> = func.children_by_role(ChildRole::Argument).collect();
            assert_eq!(params.len(), 1);
            assert_eq!(params[0].kind, ActionKind::DeclareParam);
            assert!(func.children_by_role(ChildRole::Body).next().is_some());
        }

        #[test]
        fn should_mark_expression_arrows() {
            let tree = lower("const f = x => x + 1;");
            let decl = &tree.root.children[0].node;
            let arrow = decl.child_by_role(ChildRole::Init).expect("arrow");
            assert_eq!(arrow.kind, ActionKind::ArrowFunction);
            assert_eq!(arrow.attr_bool("expression"), Some(true));
        }

        #[test]
        fn should_lower_update_to_unary_with_writeback_shape() {
            let tree = lower("count++;");
            let update = &tree.root.children[0].node;
            assert_eq!(update.kind, ActionKind::UnaryOp);
            assert_eq!(update.attr_str("op"), Some("++"));
            assert_eq!(update.attr_bool("prefix"), Some(false));
            assert!(update.child_by_role(ChildRole::Argument).is_some());
        }

        #[test]
        fn should_lower_literals_with_typed_attributes() {
            let tree = lower("const values = ['s', 2, true, null];");
            let array = tree.root.children[0]
                .node
                .child_by_role(ChildRole::Init)
                .expect("array");
            let items: Vec<_> = array.children_by_role(ChildRole::Value).collect();
            assert_eq!(items[0].attr_str("type"), Some("string"));
            assert_eq!(items[0].attr_str("value"), Some("s"));
            assert_eq!(items[1].attr_str("type"), Some("number"));
            assert_eq!(items[1].attr_int("value"), Some(2));
            assert_eq!(items[2].attr_bool("value"), Some(true));
            assert_eq!(items[3].attr_str("type"), Some("null"));
        }
    }

    mod call_patterns {
        use super::*;
        use a11y_analyzer::action::Action;

        fn first_call(tree: &ActionTree) -> &Action {
            tree.root
                .find_all(&|n| n.kind == ActionKind::Call)
                .into_iter()
                .next()
                .expect("a call node")
        }

        #[test]
        fn should_record_dotted_callee() {
            let tree = lower("document.getElementById('x');");
            let call = first_call(&tree);
            assert_eq!(call.attr_str("callee"), Some("document.getElementById"));
            assert_eq!(call.attr_str("pattern"), Some("domAccess"));
        }

        #[test]
        fn should_tag_event_handler_registration_through_chains() {
            let tree = lower("document.getElementById('x').addEventListener('click', () => {});");
            let outer = first_call(&tree);
            assert_eq!(
                outer.attr_str("callee"),
                Some("document.getElementById.addEventListener")
            );
            assert_eq!(outer.attr_str("pattern"), Some("eventHandler"));
        }

        #[test]
        fn should_tag_timers_focus_and_aria_writes() {
            let tree = lower("setTimeout(tick, 100);");
            assert_eq!(first_call(&tree).attr_str("pattern"), Some("timer"));

            let tree = lower("field.focus();");
            assert_eq!(first_call(&tree).attr_str("pattern"), Some("focusOp"));

            let tree = lower("el.setAttribute('aria-expanded', 'true');");
            assert_eq!(first_call(&tree).attr_str("pattern"), Some("ariaChange"));

            let tree = lower("el.setAttribute('data-x', '1');");
            assert_eq!(first_call(&tree).attr_str("pattern"), None);
        }
    }

    mod invariants {
        use super::*;

        #[test]
        fn should_keep_preorder_spans_monotonic() {
            let tree = lower(
                "const items = [1, 2, 3];\n\
                 function total(list) {\n\
                 \tlet sum = 0;\n\
                 \tfor (let i = 0; i < list.length; i++) { sum += list[i]; }\n\
                 \tdo { sum--; } while (false);\n\
                 \ttry { check(sum); } catch (e) { report(e); } finally { done(); }\n\
                 \tswitch (sum) { case 1: return 1; default: return sum; }\n\
                 }\n",
            );
            let violations = tree.validate();
            assert!(violations.is_empty(), "violations: {:?}", violations);
        }

        #[test]
        fn should_validate_roles_against_schema() {
            let tree = lower("if (a) { b(); } while (c) { d(); }");
            assert!(tree.validate().is_empty());
        }
    }
}
