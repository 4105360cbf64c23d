use mtutils::amap::Amap;
use crossbeam_utils::thread;
use rand::prelude::SliceRandom;
use rand::thread_rng;
use rand::Rng;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use super::random::Random;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Operation {
    Set,
    Get,
    Release,
    Delete,
    Len,
}

const OPS: [Operation; 5] = [
    Operation::Set,
    Operation::Get,
    Operation::Release,
    Operation::Delete,
    Operation::Len,
];

// run `iter` random operations from one caller, checking every result against `reference`
fn run_against_reference<K>(map: &Amap<K, u64>, reference: &mut HashMap<K, u64>, iter: u64)
where
    K: Eq + Hash + Clone + Send + Debug + Random + 'static,
{
    let mut rng = thread_rng();

    for i in 1..=iter {
        let key = K::gen(&mut rng);

        match OPS.choose(&mut rng).unwrap() {
            Operation::Set => {
                let value: u64 = rng.gen();

                assert_eq!(map.insert(key.clone(), value).wait(), Some(()));
                reference.insert(key, value);
            }
            Operation::Get => {
                assert_eq!(
                    map.get(key.clone()).wait(),
                    reference.get(&key).cloned(),
                    "[{:0>10}] Get: {:?}",
                    i,
                    key
                );
            }
            Operation::Release => {
                assert_eq!(
                    map.release(key.clone()).wait(),
                    reference.remove(&key),
                    "[{:0>10}] Release: {:?}",
                    i,
                    key
                );
            }
            Operation::Delete => {
                assert_eq!(map.delete(key.clone()).wait(), Some(()));
                reference.remove(&key);
            }
            Operation::Len => {
                assert_eq!(map.len().wait(), Some(reference.len()), "[{:0>10}] Len", i);
            }
        }
    }
}

pub fn stress_sequential<K>(iter: u64)
where
    K: Eq + Hash + Clone + Send + Debug + Random + 'static,
{
    let map: Amap<K, u64> = Amap::new(16);
    let mut reference = HashMap::new();

    run_against_reference(&map, &mut reference, iter);

    assert_eq!(map.len().wait(), Some(reference.len()));

    let listed = map.list().into_iter().collect::<HashMap<_, _>>();
    assert_eq!(listed, reference);
}

// every thread works on its own key space, so each thread's view must stay exact
pub fn stress_concurrent(iter: u64, thread_num: u64) {
    let map = Amap::new(thread_num as usize);

    let references = thread::scope(|s| {
        let map = &map;
        let mut threads = Vec::new();

        for t in 0..thread_num {
            threads.push(s.spawn(move |_| {
                let mut reference = HashMap::new();
                let mut rng = thread_rng();

                for _ in 0..iter {
                    let key = (t, u64::gen(&mut rng));

                    match OPS.choose(&mut rng).unwrap() {
                        Operation::Set => {
                            let value: u64 = rng.gen();

                            map.insert(key, value).wait();
                            reference.insert(key, value);
                        }
                        Operation::Get => {
                            assert_eq!(map.get(key).wait(), reference.get(&key).cloned());
                        }
                        Operation::Release => {
                            assert_eq!(map.release(key).wait(), reference.remove(&key));
                        }
                        Operation::Delete => {
                            map.delete(key).wait();
                            reference.remove(&key);
                        }
                        Operation::Len => {
                            // other threads hold keys of their own
                            assert!(map.len().wait().unwrap() >= reference.len());
                        }
                    }
                }

                reference
            }));
        }

        threads
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    })
    .unwrap();

    let expected = references
        .into_iter()
        .flatten()
        .collect::<HashMap<(u64, u64), u64>>();

    assert_eq!(map.len().wait(), Some(expected.len()));
    assert_eq!(map.list().into_iter().collect::<HashMap<_, _>>(), expected);
}
