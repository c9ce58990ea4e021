//! Example Game - a minimal console demo of the stat engine
//!
//! This demo shows:
//! - Registering stats, aliases, and a conditional extension
//! - Equipment contributing permanent modifiers under one source label
//! - A timed buff expiring through the session tick
//! - Category gating toggling a conditional bonus on and off
//! - The diagnostic stat report

use stat_engine::prelude::*;
use std::rc::Rc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_damage(session: &StatSession) {
    let hero = session
        .collection("hero")
        .expect("hero spawned at startup");
    println!(
        "t={:>4.1}s  damage = {:.1}  armour = {:.1}",
        session.now(),
        hero.get_value("damage", 0.0),
        hero.get_value("armour", 0.0),
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Registration: the whole schema is these calls ---
    let mut registry = StatRegistry::with_defaults();
    let fire_damage = registry
        .register_extension("damage", CategorySet::FIRE, "with Fire skills")
        .expect("damage is registered");
    let registry = Rc::new(registry);

    let mut session = StatSession::with_poll_interval(Rc::clone(&registry), 0.25);

    // --- Spawn the hero and set base values (aliases work everywhere) ---
    let hero = session.spawn("hero");
    hero.set_base_value("hp", 120.0);
    hero.set_base_value("damage", 50.0);
    hero.set_base_value("armor", 100.0);

    // --- Equip a sword: permanent modifiers under one source ---
    session.add_modifier(
        "hero",
        StatModifier::new("sword_damage", "damage", 25.0, ModifierKind::Additive, "rusty_sword"),
    );
    session.add_modifier(
        "hero",
        StatModifier::new(
            "sword_fire_damage",
            &fire_damage,
            30.0,
            ModifierKind::Additive,
            "rusty_sword",
        ),
    );
    info!("equipped rusty_sword");
    print_damage(&session);

    // --- The fire bonus only matters while a Fire skill is active ---
    let hero = session.collection_mut("hero").expect("hero exists");
    hero.add_active_categories("damage", CategorySet::FIRE);
    println!("-- casting a Fire skill --");
    print_damage(&session);

    let hero = session.collection_mut("hero").expect("hero exists");
    hero.remove_active_categories("damage", CategorySet::FIRE);
    println!("-- back to a plain attack --");
    print_damage(&session);

    // --- A 2 second battle cry, expired by the sweeper ---
    session.add_modifier(
        "hero",
        StatModifier::new("battle_cry", "damage", 40.0, ModifierKind::PercentAdditive, "war_horn")
            .with_duration(2.0),
    );
    println!("-- battle cry! (+40% damage for 2s) --");
    print_damage(&session);

    let mut elapsed = 0.0;
    while elapsed < 2.5 {
        let expired = session.tick(0.5);
        elapsed += 0.5;
        if expired > 0 {
            println!("-- battle cry wore off --");
        }
        print_damage(&session);
    }

    // --- Consumers read change notifications after the fact ---
    let hero = session.collection_mut("hero").expect("hero exists");
    for event in hero.drain_events() {
        if let StatEvent::StatChanged { id, value } = event {
            info!(stat = %id, value, "stat changed");
        }
    }

    // --- Diagnostic dump ---
    println!();
    let now = session.now();
    let hero = session.collection("hero").expect("hero exists");
    print!("{}", collection_report(hero, now));
}
