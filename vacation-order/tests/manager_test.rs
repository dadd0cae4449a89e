use std::sync::atomic::{AtomicI64, Ordering};

use vacation_catalog::ReservationInfo;
use vacation_core::{FailureClass, ReservationKind};
use vacation_order::{audit, ManagerError, ResourceManager};

fn scenario_b() -> ResourceManager {
    let manager = ResourceManager::new();
    manager.add_car(1, 100, 50).unwrap();
    manager.add_customer(7).unwrap();
    manager.reserve_car(7, 1).unwrap();
    manager
}

#[test]
fn test_scenario_add_and_query() {
    let manager = ResourceManager::new();
    manager.add_car(1, 100, 50).unwrap();

    assert_eq!(manager.query_car(1), Some(100));
    assert_eq!(manager.query_car_price(1), Some(50));
    assert_eq!(manager.query_flight(1), None);
    assert_eq!(manager.query_room_price(1), None);
}

#[test]
fn test_scenario_reserve_and_bill() {
    let manager = scenario_b();

    assert_eq!(manager.query_car(1), Some(99));
    assert_eq!(manager.query_customer_bill(7), Some(50));
    assert_eq!(
        manager.customer_reservations(7).unwrap(),
        vec![ReservationInfo::new(ReservationKind::Car, 1, 50)]
    );
}

#[test]
fn test_scenario_delete_customer_restores_inventory() {
    let manager = scenario_b();
    manager.delete_customer(7).unwrap();

    assert_eq!(manager.query_car(1), Some(100));
    assert_eq!(manager.query_customer_bill(7), None);
    assert!(audit(&manager).is_clean());
}

#[test]
fn test_scenario_delete_flight_in_use() {
    let manager = ResourceManager::new();
    manager.add_flight(3, 10, 200).unwrap();
    manager.add_customer(1).unwrap();
    manager.reserve_flight(1, 3).unwrap();
    let before = manager.inventory(ReservationKind::Flight, 3).unwrap();

    let err = manager.delete_flight(3).unwrap_err();
    assert_eq!(err.class(), FailureClass::Precondition);
    assert_eq!(manager.inventory(ReservationKind::Flight, 3).unwrap(), before);

    manager.cancel_flight(1, 3).unwrap();
    manager.delete_flight(3).unwrap();
    assert_eq!(manager.query_flight(3), None);
}

#[test]
fn test_bill_uses_price_at_reservation_time() {
    let manager = scenario_b();
    manager.add_car(1, 0, 90).unwrap();
    assert_eq!(manager.query_car_price(1), Some(90));
    assert_eq!(manager.query_customer_bill(7), Some(50));

    manager.add_room(2, 5, 70).unwrap();
    manager.reserve_room(7, 2).unwrap();
    assert_eq!(manager.query_customer_bill(7), Some(120));
}

#[test]
fn test_restock_past_i64_max_is_rejected() {
    let manager = ResourceManager::new();
    manager.add_car(1, i64::MAX, 0).unwrap();
    let before = manager.inventory(ReservationKind::Car, 1).unwrap();

    let err = manager.add_car(1, 1, 0).unwrap_err();
    assert_eq!(err.class(), FailureClass::InvalidArgument);
    assert_eq!(manager.inventory(ReservationKind::Car, 1).unwrap(), before);

    // still usable afterwards
    manager.delete_car(1, 10).unwrap();
    assert_eq!(manager.query_car(1), Some(i64::MAX - 10));
}

#[test]
fn test_bill_at_extreme_prices() {
    let manager = ResourceManager::new();
    manager.add_car(1, 1, i64::MAX).unwrap();
    manager.add_room(1, 1, i64::MAX).unwrap();
    manager.add_customer(1).unwrap();
    manager.reserve_car(1, 1).unwrap();
    manager.reserve_room(1, 1).unwrap();

    assert_eq!(manager.query_customer_bill(1), Some(i64::MAX));
    manager.delete_customer(1).unwrap();
    assert_eq!(manager.query_car(1), Some(1));
    assert!(audit(&manager).is_clean());
}

#[test]
fn test_failed_reserve_changes_nothing() {
    let manager = ResourceManager::new();
    manager.add_room(5, 1, 80).unwrap();
    manager.add_customer(1).unwrap();
    manager.add_customer(2).unwrap();
    manager.reserve_room(1, 5).unwrap();

    let room_before = manager.inventory(ReservationKind::Room, 5).unwrap();
    let list_before = manager.customer_reservations(2).unwrap();

    // sold out
    let err = manager.reserve_room(2, 5).unwrap_err();
    assert_eq!(err.class(), FailureClass::Precondition);
    assert_eq!(manager.inventory(ReservationKind::Room, 5).unwrap(), room_before);
    assert_eq!(manager.customer_reservations(2).unwrap(), list_before);

    // unknown customer
    manager.add_room(5, 1, -1).unwrap();
    let room_before = manager.inventory(ReservationKind::Room, 5).unwrap();
    assert_eq!(manager.reserve_room(9, 5).unwrap_err(), ManagerError::CustomerNotFound(9));
    assert_eq!(manager.inventory(ReservationKind::Room, 5).unwrap(), room_before);
}

#[test]
fn test_duplicate_reserve_is_rolled_back() {
    let manager = scenario_b();
    let car_before = manager.inventory(ReservationKind::Car, 1).unwrap();
    let list_before = manager.customer_reservations(7).unwrap();

    let err = manager.reserve_car(7, 1).unwrap_err();
    assert!(matches!(err, ManagerError::Customer(_)));
    assert_eq!(err.class(), FailureClass::Precondition);

    assert_eq!(manager.inventory(ReservationKind::Car, 1).unwrap(), car_before);
    assert_eq!(manager.customer_reservations(7).unwrap(), list_before);
}

#[test]
fn test_rollback_with_preinserted_entry() {
    let manager = ResourceManager::new();
    manager.add_flight(4, 10, 300).unwrap();
    manager.add_customer(2).unwrap();
    manager
        .customers()
        .get(2)
        .unwrap()
        .add_reservation_info(ReservationKind::Flight, 4, 1)
        .unwrap();
    let before = manager.inventory(ReservationKind::Flight, 4).unwrap();

    assert!(manager.reserve_flight(2, 4).is_err());
    assert_eq!(manager.inventory(ReservationKind::Flight, 4).unwrap(), before);
    assert_eq!(manager.query_customer_bill(2), Some(1));
}

#[test]
fn test_delete_customer_skips_vanished_inventory() {
    let manager = ResourceManager::new();
    manager.add_car(1, 10, 50).unwrap();
    manager.add_customer(3).unwrap();
    manager
        .customers()
        .get(3)
        .unwrap()
        .add_reservation_info(ReservationKind::Room, 42, 10)
        .unwrap();
    manager.reserve_car(3, 1).unwrap();

    manager.delete_customer(3).unwrap();
    assert_eq!(manager.query_car(1), Some(10));
    assert_eq!(manager.query_customer_bill(3), None);
}

#[test]
fn test_concurrent_reservations_on_one_record() {
    let total = 50;
    let manager = ResourceManager::new();
    manager.add_car(1, total, 50).unwrap();
    for customer in 1..=200 {
        manager.add_customer(customer).unwrap();
    }
    let granted = AtomicI64::new(0);

    std::thread::scope(|s| {
        for t in 0..8_i64 {
            let manager = &manager;
            let granted = &granted;
            s.spawn(move || {
                for customer in (1..=200).filter(|c| c % 8 == t) {
                    if manager.reserve_car(customer, 1).is_ok() {
                        granted.fetch_add(1, Ordering::SeqCst);
                    }
                    let inv = manager.inventory(ReservationKind::Car, 1).unwrap();
                    assert!(inv.is_consistent());
                }
            });
        }
    });

    let inv = manager.inventory(ReservationKind::Car, 1).unwrap();
    assert_eq!(granted.load(Ordering::SeqCst), total);
    assert_eq!(inv.num_free, 0);
    assert_eq!(inv.num_used, total);
    assert!(audit(&manager).is_clean());
}

#[test]
fn test_reserve_races_delete_customer() {
    let manager = ResourceManager::new();
    for id in 1..=20 {
        manager.add_car(id, 1_000, 50).unwrap();
        manager.add_room(id, 1_000, 60).unwrap();
    }

    std::thread::scope(|s| {
        for t in 0..4_i64 {
            let manager = &manager;
            s.spawn(move || {
                for round in 0..500_i64 {
                    let customer = (round + t) % 10 + 1;
                    let resource = (round * 7 + t) % 20 + 1;
                    let _ = manager.add_customer(customer);
                    let _ = manager.reserve_car(customer, resource);
                    let _ = manager.reserve_room(customer, resource);
                    if round % 5 == t {
                        let _ = manager.delete_customer(customer);
                    }
                    if round % 11 == 0 {
                        let _ = manager.cancel_room(customer, resource);
                    }
                }
            });
        }
    });

    let report = audit(&manager);
    assert!(report.is_clean(), "{:?}", report.violations);
}

#[test]
fn test_restock_races_withdrawal() {
    let manager = ResourceManager::new();

    std::thread::scope(|s| {
        for t in 0..4_i64 {
            let manager = &manager;
            s.spawn(move || {
                for round in 0..1_000_i64 {
                    let id = round % 4 + 1;
                    if (round + t) % 2 == 0 {
                        let _ = manager.add_room(id, 100, 60);
                    } else {
                        let _ = manager.delete_room(id, 100);
                    }
                }
            });
        }
    });

    for id in 1..=4 {
        if let Some(inv) = manager.inventory(ReservationKind::Room, id) {
            assert!(inv.is_consistent());
            assert!(inv.num_total > 0);
            assert_eq!(inv.num_total % 100, 0);
        }
    }
    assert!(audit(&manager).is_clean());
}
