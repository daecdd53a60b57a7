//! Pareto filtering under weak dominance.
//!
//! Every filter keeps the elements that are not dominated by another retained element. When two
//! elements dominate each other the earlier one is kept, and the input order is preserved.

use crate::abstract_plants::Dominance;

/// Marks the elements of `v` to keep, where `dom(x, y)` means `x` weakly dominates `y`.
fn non_dominating_mask<T>(v: &[T], dom: impl Fn(&T, &T) -> bool) -> Vec<bool> {
    let mut keeps: Vec<bool> = vec![true; v.len()];
    for i in 0..v.len() {
        if !keeps[i] {
            continue;
        }
        let x = &v[i];
        for j in i + 1..v.len() {
            if !keeps[j] {
                continue;
            }
            let y = &v[j];
            if dom(x, y) {
                keeps[j] = false;
            } else if dom(y, x) {
                keeps[i] = false;
                break;
            }
        }
    }
    keeps
}

fn retain_mask<T>(v: Vec<T>, keeps: &[bool]) -> Vec<T> {
    v.into_iter()
        .zip(keeps.iter())
        .filter_map(|(x, &keep)| keep.then_some(x))
        .collect()
}

pub fn filter_non_dominating<T, D>(s: impl IntoIterator<Item = T>) -> Vec<T>
where
    D: Dominance<T>,
{
    let v: Vec<T> = s.into_iter().collect();
    let keeps = non_dominating_mask(&v, |x, y| D::dom(x, y));
    retain_mask(v, &keeps)
}

/// Filters on the dominance of a projection of each element, such as the gamete held by a
/// lineage handle.
pub fn filter_non_dominating_key<T, U, F, D>(s: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &U,
    D: Dominance<U>,
{
    let v: Vec<T> = s.into_iter().collect();
    let keeps = non_dominating_mask(&v, |x, y| D::dom(key(x), key(y)));
    retain_mask(v, &keeps)
}

pub fn filter_non_dominating_fn<T>(
    s: impl IntoIterator<Item = T>,
    func: impl Fn(&T, &T) -> bool,
) -> Vec<T> {
    let v: Vec<T> = s.into_iter().collect();
    let keeps = non_dominating_mask(&v, func);
    retain_mask(v, &keeps)
}

/// Adds the dominance filter to any iterator so it can sit inside an adaptor chain.
pub trait IteratorNonDominating: Iterator + Sized {
    fn filter_non_dominating_fn<F>(self, func: F) -> std::vec::IntoIter<Self::Item>
    where
        F: Fn(&Self::Item, &Self::Item) -> bool,
    {
        filter_non_dominating_fn(self, func).into_iter()
    }
}

impl<I: Iterator> IteratorNonDominating for I {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    struct MaxDom;

    impl Dominance<i32> for MaxDom {
        fn dom(x: &i32, y: &i32) -> bool {
            x >= y
        }
    }

    #[test]
    fn filter_non_dominating_test() {
        for _ in 0..100 {
            let n: usize = random::<usize>() % 100 + 1;
            let v: Vec<i32> = (0..n).map(|_| random()).collect();
            let res = filter_non_dominating::<i32, MaxDom>(v.to_owned());
            assert_eq!(res.len(), 1);
            assert_eq!(v.iter().max(), res.first());
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Pair {
        a: i32,
        b: i32,
    }

    impl Dominance<Pair> for Pair {
        fn dom(x: &Pair, y: &Pair) -> bool {
            x.a >= y.a && x.b >= y.b
        }
    }

    impl Pair {
        fn new(a: i32, b: i32) -> Self {
            Self { a, b }
        }

        fn random() -> Self {
            Self {
                a: random::<i32>() % 20,
                b: random::<i32>() % 20,
            }
        }
    }

    fn pairs(v: &[(i32, i32)]) -> Vec<Pair> {
        v.iter().map(|&(a, b)| Pair::new(a, b)).collect()
    }

    #[test]
    fn filter_non_dominating_pair_test() {
        let input = pairs(&[
            (2, 3),
            (4, 5),
            (0, 9),
            (5, 1),
            (5, 0),
            (2, 5),
            (9, 7),
            (5, 4),
            (0, 8),
            (5, 5),
            (6, 2),
            (4, 4),
            (4, 3),
            (2, 2),
            (9, 1),
            (8, 8),
            (4, 3),
            (2, 1),
            (0, 4),
        ]);
        assert_eq!(
            pairs(&[(0, 9), (9, 7), (8, 8)]),
            filter_non_dominating::<Pair, Pair>(input)
        );

        let input = pairs(&[
            (2, 3),
            (4, 5),
            (0, 9),
            (5, 1),
            (5, 0),
            (2, 5),
            (5, 4),
            (0, 8),
            (5, 5),
            (6, 2),
            (4, 4),
            (4, 3),
            (2, 2),
            (9, 1),
            (4, 3),
            (2, 1),
            (0, 4),
        ]);
        assert_eq!(
            pairs(&[(0, 9), (5, 5), (6, 2), (9, 1)]),
            filter_non_dominating::<Pair, Pair>(input)
        );
    }

    #[test]
    fn filter_non_dominating_random_pair_test() {
        for _ in 0..100 {
            let n: usize = random::<usize>() % 100 + 1;
            let v: Vec<Pair> = (0..n).map(|_| Pair::random()).collect();
            let res = filter_non_dominating::<Pair, Pair>(v.clone());
            assert!(!res.is_empty());
            for i in 0..res.len() {
                for j in 0..i {
                    assert!(!Pair::dom(&res[i], &res[j]) && !Pair::dom(&res[j], &res[i]));
                }
            }
            // every dropped element is dominated by a kept one
            for x in &v {
                assert!(res.iter().any(|y| Pair::dom(y, x)));
            }
        }
    }

    #[test]
    fn equal_elements_keep_earliest_test() {
        let v = vec![(1, 'a'), (0, 'b'), (1, 'c')];
        assert_eq!(
            vec![(1, 'a')],
            filter_non_dominating_key::<_, i32, _, MaxDom>(v, |(x, _)| x)
        );
    }

    #[test]
    fn iterator_adaptor_test() {
        let res: Vec<Pair> = pairs(&[(1, 2), (2, 1), (0, 0), (2, 2), (3, 0)])
            .into_iter()
            .filter_non_dominating_fn(|x, y| Pair::dom(x, y))
            .collect();
        assert_eq!(pairs(&[(2, 2), (3, 0)]), res);
    }
}
