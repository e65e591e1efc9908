use cucumber::given;

use crate::cucumber::{settlement_world::SettlementSystem, SettlementWorld};

#[given("a fresh settlement engine")]
async fn fresh_engine(world: &mut SettlementWorld) {
    world.system = Some(SettlementSystem::new().await);
}

#[given(expr = "the rail issues the aliases {string} and {string}")]
async fn rail_aliases(world: &mut SettlementWorld, first: String, second: String) {
    world.system().rail.issue_aliases(&[first.as_str(), second.as_str()]);
}
