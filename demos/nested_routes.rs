//! Nested Routes Example - router views resolving successive depths
//!
//! Builds a three-level route tree, mounts one `<router-view>` and lets each
//! page host a nested view. Navigation swaps the deepest page and a counter
//! prop re-renders in place.
//!
//! Run with: RUST_LOG=oz_element=debug cargo run --example nested_routes

use oz_element::{
    html, nested_view, router_view, Declaration, Document, Part, Record, Registry, RouteRecord,
    Router, Template, Value,
};
use tracing_subscriber::EnvFilter;

fn main() -> oz_element::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== oz-element Nested Routes Example ===\n");

    let registry = Registry::new();
    let document = Document::with_registry(registry.clone());

    let shell = registry.register(
        Declaration::new("app-shell")
            .template(|ctx| html(&["shell[", "]"], [nested_view(ctx)])),
    )?;
    let users = registry.register(
        Declaration::new("user-list")
            .template(|ctx| html(&["users[", "]"], [nested_view(ctx)])),
    )?;
    let profile = registry.register(
        Declaration::new("user-profile")
            .props(["visits"])
            .state_literal(Record::from([("name".to_owned(), Value::from("ada"))]))
            .template(|ctx| {
                html(
                    &["profile ", " visits=", ""],
                    [Part::from(ctx.state().get("name")), Part::from(ctx.props().get("visits"))],
                )
            }),
    )?;
    let settings =
        registry.register(Declaration::new("user-settings").template(|_| Template::text("settings")))?;

    let root = RouteRecord::root(vec![shell]);
    let users_route = RouteRecord::child(&root, vec![users]);
    let profile_route = RouteRecord::child(&users_route, vec![profile]);
    let settings_route = RouteRecord::child(&users_route, vec![settings]);

    let router = Router::new();
    router.navigate_to(&profile_route)?;

    let view = router_view(&document, &router)?;
    document.append_child(document.body(), view.node())?;
    println!("profile:  {}", document.text_content(view.node()));

    // The innermost page is the only component carrying the prop.
    if let Some(page) = document
        .composed_descendants(view.node())
        .into_iter()
        .filter_map(|node| document.component(node))
        .find(|element| element.name() == "user-profile")
    {
        document.set_attribute(page.node(), "visits", "3")?;
    }
    println!("visited:  {}", document.text_content(view.node()));

    router.navigate_to(&settings_route)?;
    println!("settings: {}", document.text_content(view.node()));

    router.navigate(None)?;
    println!("no match: {:?}", document.text_content(view.node()));

    println!("\nlive nodes: {}", document.node_count());
    Ok(())
}
