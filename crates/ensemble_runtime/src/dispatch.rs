//! Dispatch engine — combinatorial invocation of a system's callable.
//!
//! One dispatch pass enumerates the Cartesian product of every role's
//! current membership list and invokes the system's callable once per
//! combination. Iteration runs over a snapshot taken at the start of the
//! pass, so membership changes made mid-pass never disturb the enumeration.

use tracing::debug;

use crate::system::System;
use crate::world::World;

/// Executes one full pass of a system over every eligible role combination.
///
/// For `k` roles with membership sizes `n_1..n_k`, exactly `∏ n_i`
/// invocations occur, nested with the first declared role varying slowest.
/// A system with an unsatisfied role performs no work; a system with zero
/// roles is invoked exactly once with an empty binding.
pub(crate) fn run_system(world: &mut World, system: &mut System) {
    let snapshots = system.target_snapshots();

    let combinations: usize = snapshots.iter().map(Vec::len).product();
    debug!(system = system.name(), combinations, "dispatch pass");
    if combinations == 0 {
        return;
    }

    let k = snapshots.len();
    let mut indices = vec![0usize; k];
    let mut args = Vec::with_capacity(k);
    loop {
        args.clear();
        args.extend(indices.iter().zip(&snapshots).map(|(&i, targets)| targets[i]));
        system.invoke(world, &args);

        // Odometer increment: the last declared role varies fastest.
        let mut position = k;
        loop {
            if position == 0 {
                return;
            }
            position -= 1;
            indices[position] += 1;
            if indices[position] < snapshots[position].len() {
                break;
            }
            indices[position] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use ensemble_core::Entity;

    use super::*;

    fn recorded_system(roles: &[(&str, &[&str])]) -> (System, Rc<RefCell<Vec<Vec<Entity>>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        let mut builder = System::builder("recorded");
        for (name, requires) in roles {
            builder = builder.role(*name, requires.iter().copied());
        }
        let system = builder.process(move |_, args| sink.borrow_mut().push(args.to_vec()));
        (system, calls)
    }

    #[test]
    fn test_product_count() {
        let (mut system, calls) = recorded_system(&[("a", &["x"]), ("b", &["y"])]);

        let mut world = World::new();
        let xs: Vec<Entity> = (0..3).map(|_| world.spawn([("x", json!(1))])).collect();
        let ys: Vec<Entity> = (0..4).map(|_| world.spawn([("y", json!(1))])).collect();
        for &e in xs.iter().chain(&ys) {
            system.register(e, world.attributes(e).unwrap());
        }

        run_system(&mut world, &mut system);
        assert_eq!(calls.borrow().len(), 12);
    }

    #[test]
    fn test_unsatisfied_role_means_no_work() {
        let (mut system, calls) = recorded_system(&[("a", &["x"]), ("b", &["y"])]);

        let mut world = World::new();
        let e = world.spawn([("x", json!(1))]);
        system.register(e, world.attributes(e).unwrap());

        run_system(&mut world, &mut system);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_zero_roles_invokes_once() {
        let (mut system, calls) = recorded_system(&[]);
        let mut world = World::new();

        run_system(&mut world, &mut system);
        assert_eq!(*calls.borrow(), vec![Vec::<Entity>::new()]);
    }

    #[test]
    fn test_first_role_varies_slowest() {
        let (mut system, calls) = recorded_system(&[("a", &["x"]), ("b", &["y"])]);

        let mut world = World::new();
        let a1 = world.spawn([("x", json!(1))]);
        let a2 = world.spawn([("x", json!(1))]);
        let b1 = world.spawn([("y", json!(1))]);
        let b2 = world.spawn([("y", json!(1))]);
        for &e in &[a1, a2, b1, b2] {
            system.register(e, world.attributes(e).unwrap());
        }

        run_system(&mut world, &mut system);
        assert_eq!(
            *calls.borrow(),
            vec![
                vec![a1, b1],
                vec![a1, b2],
                vec![a2, b1],
                vec![a2, b2],
            ]
        );
    }

    #[test]
    fn test_mirror_combination_binds_same_entity_twice() {
        let (mut system, calls) = recorded_system(&[("first", &["name"]), ("second", &["name"])]);

        let mut world = World::new();
        let e = world.spawn([("name", json!("Eric"))]);
        system.register(e, world.attributes(e).unwrap());

        run_system(&mut world, &mut system);
        assert_eq!(*calls.borrow(), vec![vec![e, e]]);
    }

    #[test]
    fn test_pairs_bruteforce() {
        // The original pairs scenario: roles first/second over `name`,
        // container over `pairs`; one pass yields all nine ordered pairs.
        let mut system = System::builder("pairs")
            .role("first", ["name"])
            .role("second", ["name"])
            .role("container", ["pairs"])
            .process(|world: &mut World, args: &[Entity]| {
                let pair = format!(
                    "{} & {}",
                    world.get_str(args[0], "name").unwrap(),
                    world.get_str(args[1], "name").unwrap()
                );
                world
                    .get_attribute_mut(args[2], "pairs")
                    .unwrap()
                    .as_array_mut()
                    .unwrap()
                    .push(json!(pair));
            });

        let mut world = World::new();
        for name in ["Eric", "Red", "Kitty"] {
            let e = world.spawn([("name", json!(name))]);
            system.register(e, world.attributes(e).unwrap());
        }
        let container = world.spawn([("pairs", json!([]))]);
        system.register(container, world.attributes(container).unwrap());

        run_system(&mut world, &mut system);

        let pairs = world.get_attribute(container, "pairs").unwrap();
        let got: std::collections::BTreeSet<&str> = pairs
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        let expected: std::collections::BTreeSet<&str> = [
            "Eric & Eric", "Eric & Red", "Eric & Kitty",
            "Red & Eric", "Red & Red", "Red & Kitty",
            "Kitty & Eric", "Kitty & Red", "Kitty & Kitty",
        ]
        .into_iter()
        .collect();
        assert_eq!(got, expected);
    }
}
