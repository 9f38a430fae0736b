use shadow_rs::ShadowBuilder;

fn main() {
    #[allow(clippy::unwrap_used)]
    ShadowBuilder::builder().build().unwrap();
}
