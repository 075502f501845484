//! Bounce Demo
//!
//! Drops a ball with `easeOutBounce`, squashes it on landing through the
//! `scale` splitter and prints a few frames along the way:
//! - `FrameTicker` driving the engine in real time
//! - Chained tweens from an `on_complete` callback
//! - A caller printing the ball position five times
//!
//! Run with: RUST_LOG=tweener=debug cargo run -p tweener --example bounce

use std::rc::Rc;
use tracing_subscriber::EnvFilter;
use tweener::{
    register_default_special_properties, shared, Easing, FrameTicker, PropertyBag, Target,
    TweenParams, Tweener,
};

fn main() -> tweener::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let ticker = Rc::new(FrameTicker::default());
    let tweener = Tweener::with_ticker(ticker.clone());
    register_default_special_properties(&tweener);

    let ball = shared(
        PropertyBag::new()
            .with("y", 0.0)
            .with("scale_x", 1.0)
            .with("scale_y", 1.0),
    );

    let squash = tweener.clone();
    tweener.add_tween(
        &ball,
        TweenParams::new()
            .time(1.2)
            .transition(Easing::EaseOutBounce)
            .rounded(true)
            .property("y", 300.0)
            .on_complete(move |ball: &Target| {
                squash
                    .add_tween(
                        ball,
                        TweenParams::new()
                            .time(0.25)
                            .transition(Easing::EaseOutBack)
                            .property("scale", serde_json::json!([1.3, 0.7])),
                    )
                    .map(|_| ())
            }),
    )?;

    tweener.add_caller(
        &ball,
        TweenParams::new()
            .time(1.2)
            .count(5)
            .transition(Easing::Linear)
            .on_update(|ball: &Target| {
                let ball = ball.borrow();
                println!(
                    "y = {:>5.0}  scale = {:.2} x {:.2}",
                    ball.get_property("y").unwrap_or_default(),
                    ball.get_property("scale_x").unwrap_or_default(),
                    ball.get_property("scale_y").unwrap_or_default(),
                );
            }),
    )?;

    // Runs until the engine drains and stops the ticker
    ticker.run();

    let ball = ball.borrow();
    println!(
        "landed: y = {}  scale = {:.2} x {:.2}",
        ball.get_property("y").unwrap_or_default(),
        ball.get_property("scale_x").unwrap_or_default(),
        ball.get_property("scale_y").unwrap_or_default(),
    );
    Ok(())
}
