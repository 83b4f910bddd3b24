use proptest::prelude::*;
use templet::{compile, render, DataModel, Value};

const FLAGS: usize = 4;

/// A template shape made of text and (possibly nested) if/else blocks.
#[derive(Debug, Clone)]
enum Shape {
    Text(String),
    If {
        flag: usize,
        then: Vec<Shape>,
        otherwise: Option<Vec<Shape>>,
    },
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = "[a-z ]{1,6}".prop_map(Shape::Text);
    leaf.prop_recursive(6, 48, 3, |inner| {
        (
            0..FLAGS,
            prop::collection::vec(inner.clone(), 0..3),
            prop::option::of(prop::collection::vec(inner, 0..3)),
        )
            .prop_map(|(flag, then, otherwise)| Shape::If {
                flag,
                then,
                otherwise,
            })
    })
}

fn source(shapes: &[Shape], out: &mut String) {
    for shape in shapes {
        match shape {
            Shape::Text(text) => out.push_str(text),
            Shape::If {
                flag,
                then,
                otherwise,
            } => {
                out.push_str(&format!("{{% if f{flag} %}}"));
                source(then, out);
                if let Some(otherwise) = otherwise {
                    out.push_str("{% else %}");
                    source(otherwise, out);
                }
                out.push_str("{% endif %}");
            }
        }
    }
}

fn expected(shapes: &[Shape], flags: &[bool], out: &mut String) {
    for shape in shapes {
        match shape {
            Shape::Text(text) => out.push_str(text),
            Shape::If {
                flag,
                then,
                otherwise,
            } => {
                if flags[*flag] {
                    expected(then, flags, out);
                } else if let Some(otherwise) = otherwise {
                    expected(otherwise, flags, out);
                }
            }
        }
    }
}

fn flag_model(flags: &[bool]) -> DataModel {
    flags
        .iter()
        .enumerate()
        .map(|(i, flag)| (format!("f{i}"), Value::Bool(*flag)))
        .collect()
}

proptest! {
    #[test]
    fn text_without_delimiters_renders_to_itself(text in "[^{]*") {
        prop_assert_eq!(render(&text, &mut DataModel::new()).unwrap(), text);
    }

    #[test]
    fn nested_ifs_match_their_own_else_and_endif(
        shapes in prop::collection::vec(shape(), 0..4),
        flags in prop::collection::vec(any::<bool>(), FLAGS),
    ) {
        let mut template = String::new();
        source(&shapes, &mut template);
        let mut want = String::new();
        expected(&shapes, &flags, &mut want);

        let compiled = compile(&template).unwrap();
        let mut model = flag_model(&flags);
        let first = compiled.render(&mut model).unwrap();
        prop_assert_eq!(&first, &want);

        // Rendering again reuses the same tree and yields the same text.
        prop_assert_eq!(compiled.render(&mut model).unwrap(), first);
        prop_assert_eq!(model, flag_model(&flags));
    }

    #[test]
    fn loop_variable_binding_is_restored(
        before in prop::option::of(any::<i64>()),
        items in prop::collection::vec(any::<i64>(), 0..5),
    ) {
        let mut model = DataModel::from([("xs".to_string(), Value::from(items.clone()))]);
        if let Some(before) = before {
            model.insert("x".to_string(), Value::Int(before));
        }
        let snapshot = model.clone();

        let rendered = render("{% for x in xs %}{{ x }};{% endfor %}", &mut model).unwrap();
        let want: String = items.iter().map(|n| format!("{n};")).collect();

        prop_assert_eq!(rendered, want);
        prop_assert_eq!(model, snapshot);
    }

    #[test]
    fn nested_loops_shadow_and_restore(
        outer in prop::collection::vec(0i64..100, 0..4),
        inner in prop::collection::vec(0i64..100, 0..4),
    ) {
        let mut model = DataModel::from([
            ("xs".to_string(), Value::from(outer.clone())),
            ("ys".to_string(), Value::from(inner.clone())),
        ]);
        let template = "{% for x in xs %}{% for x in ys %}{{ x }},{% endfor %}{{ x }};{% endfor %}";

        let rendered = render(template, &mut model).unwrap();
        let row: String = inner.iter().map(|y| format!("{y},")).collect();
        let want: String = outer.iter().map(|x| format!("{row}{x};")).collect();

        prop_assert_eq!(rendered, want);
        prop_assert!(!model.contains_key("x"));
    }
}
