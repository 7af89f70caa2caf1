//! Name-range routing over the whole first-character space.

use std::sync::Arc;

use shardcat::shard::{route_for_create, RouteReason, Shard, ShardRouter};
use shardcat::storage::{MemoryBackend, NewProduct, StorageBackend};

#[test]
fn every_ascii_letter_routes_by_half() {
    for c in 'a'..='z' {
        for first in [c, c.to_ascii_uppercase()] {
            let route = route_for_create(&format!("{}rest", first)).unwrap();
            let expect = if c <= 'm' { Shard::Shard1 } else { Shard::Shard2 };
            assert_eq!(route.shard, expect, "name starting with {:?}", first);
            assert_ne!(route.reason, RouteReason::Default);
        }
    }
}

#[test]
fn non_letters_fall_back_to_shard1() {
    for name in ["0day", "_x", " space", "Émile", "ñandu", "Ωmega", "🍊 orange", "[bracket"] {
        let route = route_for_create(name).unwrap();
        assert_eq!((route.shard, route.reason), (Shard::Shard1, RouteReason::Default), "{}", name);
        assert_eq!(route.label(), "Shard1 (default)");
    }
    assert!(route_for_create("").is_err());
}

#[test]
fn boundary_letters() {
    assert_eq!(route_for_create("Mango").unwrap().label(), "Shard1 (A-M)");
    assert_eq!(route_for_create("nut").unwrap().label(), "Shard2 (N-Z)");
    assert_eq!(route_for_create("zz").unwrap().shard, Shard::Shard2);
    assert_eq!(route_for_create("a").unwrap().shard, Shard::Shard1);
}

#[test]
fn created_records_are_located_where_routed() {
    let s1 = MemoryBackend::new("shard1");
    let s2 = MemoryBackend::new("shard2");
    let router = ShardRouter::new(Arc::new(s1.clone()), Arc::new(s2.clone()));
    let names = ["Apple", "nectar", "42", "Zed", "kiwi", "Émile", "Mango", "Orange"];
    for name in names {
        let (p, route) = router.create(NewProduct::new(name, 1.0, 1)).unwrap();
        assert_eq!(router.locate(&p.id).unwrap().1, route.shard);
    }
    assert_eq!(s1.count().unwrap(), 5);
    assert_eq!(s2.count().unwrap(), 3);
    assert_eq!(router.list_all().unwrap().len(), names.len());
}
