//! Minimal demo: mount a stateful counter, drive it through events and
//! print the serialized markup after each change.

use std::cell::RefCell;
use std::rc::Rc;

use veld::{
    Component, ComponentHandle, Context, Props, Ref, Result, Runtime, State, VNode, Value,
    component_type,
};

type HandleSlot = Rc<RefCell<Option<ComponentHandle>>>;

struct Counter {
    handle: HandleSlot,
}

impl Component for Counter {
    fn initial_state(&mut self, _props: &Props) -> State {
        State::new().set("count", 0i64)
    }

    fn render(&mut self, _props: &Props, state: &State, _cx: &Context) -> Result<Option<VNode>> {
        let count = state.get("count").and_then(Value::as_int).unwrap_or(0);
        let handle = self.handle.clone();
        Ok(Some(
            VNode::element("div")
                .child(
                    VNode::element("p")
                        .child(format!("count: {count}"))
                        .build()?,
                )
                .child(
                    VNode::element("button")
                        .on("click", move || {
                            if let Some(h) = handle.borrow().clone() {
                                let _ = h.set_state(State::new().set("count", count + 1));
                            }
                        })
                        .child("increment")
                        .build()?,
                )
                .build()?,
        ))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let rt = Runtime::new();
    let container = rt.create_container("div")?;

    let slot: HandleSlot = Rc::new(RefCell::new(None));
    let writer = slot.clone();
    let for_create = slot.clone();
    let ty = component_type(move |_: &Props, _: &Context| Counter {
        handle: for_create.clone(),
    });
    rt.render(
        Some(
            VNode::component(&ty)
                .node_ref(Ref::Instance(Rc::new(move |h| *writer.borrow_mut() = h)))
                .build()?,
        ),
        container,
    )?;
    println!("{}", rt.container_html(container));

    let root = rt.document().first_child(container).expect("mounted root");
    let button = rt.document().children(root)[1];
    rt.dispatch_event(button, "click")?;
    rt.dispatch_event(button, "click")?;
    println!("{}", rt.container_html(container));
    Ok(())
}
