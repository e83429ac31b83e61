// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Registration validation and the diagnostics surface.

mod common;

use std::sync::Arc;

use common::{int_to_rat, integers, rationals, reals, tower, IntOps, WordFree};
use st_coerce::{
    action, coercion_map, conversion_map, discovery_limits, export_graph, recent_failures,
    ActSide, Action, BinOp, CoerceError, CoerceSource, Element, Morphism, Parent, Result,
    DEFAULT_RULE_COST,
};

#[test]
fn self_registration_is_rejected_immediately() {
    let z = integers();
    match Parent::register_coercion(&z, CoerceSource::from(&z)) {
        Err(CoerceError::MalformedRegistration(reason)) => {
            assert!(reason.contains("itself"), "got: {reason}")
        }
        other => panic!("expected MalformedRegistration, got {other:?}"),
    }
}

#[test]
fn morphism_with_foreign_codomain_is_rejected() {
    let z = integers();
    let q = rationals();
    let r = reals();
    let into_q = int_to_rat(&z, &q);
    match Parent::register_coercion(&r, into_q) {
        Err(CoerceError::MalformedRegistration(reason)) => {
            assert!(reason.contains("into `Q`"), "got: {reason}")
        }
        other => panic!("expected MalformedRegistration, got {other:?}"),
    }
}

#[test]
fn embeddings_validate_their_endpoints_and_set_once() {
    let z = integers();
    let q = rationals();

    // Wrong domain.
    let backwards = Morphism::from_rule(
        &q,
        &z,
        DEFAULT_RULE_COST,
        |_codomain: &st_coerce::ParentRef, _value: &Element| -> Result<Element> {
            unreachable!("never applied in this test")
        },
    );
    assert!(Parent::set_embedding(&z, backwards).is_err());

    // Valid, once.
    Parent::set_embedding(&z, int_to_rat(&z, &q)).expect("first embedding");
    assert!(Parent::set_embedding(&z, int_to_rat(&z, &q)).is_err());
}

#[test]
fn actions_must_be_declared_on_their_actor() {
    let z = integers();
    let q = rationals();
    let stray = Action::new(
        &q,
        &z,
        BinOp::Mul,
        ActSide::Left,
        |_actor: &Element, _operand: &Element| -> Result<Element> {
            unreachable!("never applied in this test")
        },
    );
    match Parent::register_action(&z, stray) {
        Err(CoerceError::MalformedRegistration(reason)) => {
            assert!(reason.contains("actor"), "got: {reason}")
        }
        other => panic!("expected MalformedRegistration, got {other:?}"),
    }
}

#[test]
fn conversion_falls_back_to_the_constructor() {
    let (z, q, _r) = tower();
    // No conversion is registered from Q down to Z; the constructor-based
    // default still answers, and integer payloads survive the trip up.
    let lift = conversion_map(&q, &z).expect("coercion reused");
    let five = Element::new(&z, 5i64);
    assert!(lift.apply(&five).is_ok());

    // Reverse direction has no coercion, so the default constructor
    // morphism is the answer; Z cannot build from a rational payload, so
    // application fails at apply time, not discovery time.
    let drop_down = conversion_map(&z, &q).expect("constructor default");
    let half = Element::new(&q, common::Rat::new(1, 2));
    assert!(drop_down.apply(&half).is_err());
}

#[test]
fn graph_export_lists_live_structures_and_their_edges() {
    let (_z, q, _r) = tower();
    let graph = export_graph();
    let structures = graph["structures"].as_array().expect("array of structures");
    let q_entry = structures
        .iter()
        .find(|s| s["name"] == "Q" && !s["coerces_from"].as_array().unwrap().is_empty())
        .expect("Q present with edges");
    assert_eq!(q_entry["coerces_from"][0], "Z");
    assert_eq!(q.name(), "Q");
}

#[test]
fn failed_discoveries_are_remembered_for_diagnostics() {
    let words = Parent::new("Wr", Arc::new(WordFree));
    let ints = Parent::new("Zr", Arc::new(IntOps));
    assert!(coercion_map(&words, &ints).is_none());
    assert!(action(&ints, &words, BinOp::Div, ActSide::Left)
        .expect("no cycle")
        .is_none());

    let failures = recent_failures();
    assert!(failures
        .iter()
        .any(|f| f.kind == "coercion" && f.target == "Wr" && f.source == "Zr"));
    assert!(failures
        .iter()
        .any(|f| f.kind == "action" && f.target == "Zr" && f.source == "Wr"));
}

#[test]
fn search_limits_have_sane_defaults() {
    let limits = discovery_limits();
    assert!(limits.search_nodes >= 8);
    assert!(limits.path_slack >= 1);
}
