use hookdom_core::prelude::*;
use hookdom_devtools::{Inspector, tree_dump};

#[derive(Clone, PartialEq)]
struct Todo {
    id: i64,
    title: String,
}

fn todo_row(_cx: &mut RenderContext<'_>, props: &Props) -> Element {
    let title = props.get_str("title").unwrap_or_default().to_string();
    create_element("li", Props::new(), children![title])
}

const TODO_ROW: Component = memo(Component::new("TodoRow", todo_row));

fn app(cx: &mut RenderContext<'_>, _props: &Props) -> Element {
    let (count, set_count) = use_state(cx, || 0i32);
    let (todos, set_todos) = use_state(cx, || {
        vec![
            Todo {
                id: 1,
                title: "Buy milk".into(),
            },
            Todo {
                id: 3,
                title: "Walk the dog".into(),
            },
        ]
    });

    use_effect(cx, Some(&[count.into()]), move || {
        log::info!("count changed to {count}");
        Dispose::none()
    });

    let rows: Vec<Element> = todos
        .iter()
        .map(|t| {
            create_element(
                TODO_ROW,
                Props::new().keyed(t.id).with("title", t.title.as_str()),
                children![],
            )
        })
        .collect();

    create_element(
        "div",
        Props::new().with("className", "app"),
        children![
            create_element("h1", Props::new(), children![format!("Count: {count}")]),
            create_element(
                "button",
                Props::new()
                    .with("id", "inc")
                    .on("onClick", move |_| set_count.update(|c| c + 1)),
                children!["Increment"],
            ),
            create_element(
                "button",
                Props::new().with("id", "add").on("onClick", move |_| {
                    set_todos.update(|list| {
                        let mut list = list.clone();
                        list.push(Todo {
                            id: 2,
                            title: "Water plants".into(),
                        });
                        list.sort_by_key(|t| t.id);
                        list
                    })
                }),
                children!["Add"],
            ),
            h("hr", Props::new()),
            create_element("ul", Props::new().with("ordered", true), children![rows]),
        ],
    )
}

fn button(rt: &Runtime<MemoryDom>, root: NodeId, id: &str) -> anyhow::Result<NodeId> {
    let dom = rt.dom();
    dom.find_all(root, "button")
        .into_iter()
        .find(|b| dom.attribute(*b, "id") == Some(id))
        .ok_or_else(|| anyhow::anyhow!("no button #{id}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut dom = MemoryDom::new();
    let root = dom.create_element("body");
    let rt = Runtime::new(dom);
    let mut inspector = Inspector::new();
    inspector.hud.toggle_inspector();

    rt.render(
        create_element(Component::new("App", app), Props::new(), children![]),
        root,
    )?;
    rt.flush()?;
    println!("{}", rt.dom().to_html(root));

    let inc = button(&rt, root, "inc")?;
    for _ in 0..3 {
        rt.dispatch(inc, "click");
    }
    rt.flush()?;
    if let Some(line) = inspector.frame(&rt) {
        println!("{line}");
    }

    let add = button(&rt, root, "add")?;
    rt.dispatch(add, "click");
    rt.flush()?;
    if let Some(line) = inspector.frame(&rt) {
        println!("{line}");
    }

    println!("{}", rt.dom().to_html(root));
    print!("{}", tree_dump(&rt, root));

    rt.unmount(root)?;
    log::info!(
        "unmounted; {} instances and {} nodes left",
        rt.instance_count(),
        rt.dom().node_count()
    );
    Ok(())
}
