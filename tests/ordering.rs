//! End-to-end ordering scenarios.

use pkgdepot::header::SimpleHeader;
use pkgdepot::model::{tag, Ds, SenseFlags, Te, TeType};
use pkgdepot::order::order;

fn provide(name: &str) -> Ds {
    Ds::new(tag::PROVIDENAME, name, "", SenseFlags(SenseFlags::ANY), 0)
}

fn require(name: &str, sense: u32) -> Ds {
    Ds::new(tag::REQUIRENAME, name, "", SenseFlags(sense), 0)
}

fn pos(order: &[usize], tes: &[Te], name: &str) -> usize {
    order.iter().position(|&i| tes[i].name == name).unwrap()
}

#[test]
fn two_element_install_a_requires_b() {
    let mut a = Te::new("A", "1-1", TeType::Added);
    a.provides.push(provide("A"));
    a.requires.push(require("B", SenseFlags::ANY));
    let mut b = Te::new("B", "1-1", TeType::Added);
    b.provides.push(provide("B"));

    let tes = vec![a, b];
    let header = SimpleHeader::new(vec![]);
    let result = order(&tes, &header, None, 0, 0);

    assert_eq!(result, vec![1, 0], "expected [B, A]");
}

#[test]
fn cycle_with_prereq_breaks_and_both_elements_survive() {
    let mut a = Te::new("A", "1-1", TeType::Added);
    a.provides.push(provide("A"));
    a.requires.push(require("B", SenseFlags::ANY | SenseFlags::PREREQ));
    let mut b = Te::new("B", "1-1", TeType::Added);
    b.provides.push(provide("B"));
    b.requires.push(require("A", SenseFlags::ANY));

    let tes = vec![a, b];
    let header = SimpleHeader::new(vec![]);
    let result = order(&tes, &header, None, 0, 0);

    assert_eq!(result.len(), 2);
    assert!(result.contains(&0) && result.contains(&1));
}

#[test]
fn install_and_erase_of_same_name_installs_then_erases() {
    let mut new_pkg = Te::new("A", "2-1", TeType::Added);
    new_pkg.provides.push(provide("A"));
    new_pkg.requires.push(require("A", SenseFlags::ANY));

    let mut old_pkg = Te::new("A", "1-1", TeType::Removed);
    old_pkg.provides.push(provide("A"));

    let tes = vec![new_pkg, old_pkg];
    let header = SimpleHeader::new(vec![]);
    let result = order(&tes, &header, None, 0, 0);

    assert_eq!(pos(&result, &tes, "A"), 0);
    assert_eq!(result.len(), 2);
}

#[test]
fn empty_transaction_orders_to_empty() {
    let tes: Vec<Te> = Vec::new();
    let header = SimpleHeader::new(vec![]);
    assert!(order(&tes, &header, None, 0, 0).is_empty());
}

#[test]
fn single_element_with_self_require_is_emitted_once() {
    let mut a = Te::new("A", "1-1", TeType::Added);
    a.provides.push(provide("A"));
    a.requires.push(require("A", SenseFlags::ANY));

    let tes = vec![a];
    let header = SimpleHeader::new(vec![]);
    let result = order(&tes, &header, None, 0, 0);
    assert_eq!(result, vec![0]);
}
