use std::collections::HashSet;
use std::fs;

use ensemble_roster::{Edit, MemberId, Roster};
use proptest::prelude::*;
use tempfile::TempDir;

fn id(id: u32) -> MemberId {
    MemberId::new(id).unwrap()
}

fn roster_lines(roster: &Roster) -> Vec<String> {
    fs::read_to_string(roster.path())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn new_roster(contents: &str) -> (TempDir, Roster) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("zoo.cfg");
    fs::write(&path, contents).unwrap();
    (dir, Roster::new(path))
}

#[test]
fn test_scale_up_then_down() {
    let (_dir, roster) = new_roster("server.1=10.0.0.1:2888:3888\n");

    let edits = roster
        .upsert_many([(id(2), "10.0.0.2"), (id(3), "10.0.0.3")])
        .unwrap();
    assert_eq!(edits, vec![Edit::Appended, Edit::Appended]);
    assert_eq!(
        roster_lines(&roster),
        vec![
            "server.1=10.0.0.1:2888:3888",
            "server.2=10.0.0.2:2888:3888",
            "server.3=10.0.0.3:2888:3888",
        ]
    );
    assert_eq!(roster.count().unwrap(), 3);

    assert_eq!(roster.remove(id(2)).unwrap(), Edit::Removed);
    assert_eq!(
        roster_lines(&roster),
        vec!["server.1=10.0.0.1:2888:3888", "server.3=10.0.0.3:2888:3888"]
    );
    assert_eq!(roster.count().unwrap(), 2);
}

#[test]
fn test_other_directives_survive_edits() {
    let template = "\
# The number of milliseconds of each tick
tickTime=2000
initLimit=10
syncLimit=5
dataDir=/var/lib/zookeeper
clientPort=2181
";
    let (_dir, roster) = new_roster(template);

    roster.upsert(id(1), "zk-1").unwrap();
    roster.upsert(id(2), "zk-2").unwrap();
    roster.set_key("clientPortAddress", "0.0.0.0").unwrap();
    roster.remove(id(1)).unwrap();
    roster.remove(id(2)).unwrap();

    let contents = fs::read_to_string(roster.path()).unwrap();
    assert_eq!(contents, format!("{template}clientPortAddress=0.0.0.0\n"));
}

#[test]
fn test_retry_after_partial_batch() {
    let (_dir, roster) = new_roster("");

    assert!(
        roster
            .upsert_many([(id(1), "a"), (id(2), "bad address"), (id(3), "c")])
            .is_err()
    );

    // retrying the whole batch with the bad pair fixed converges
    roster
        .upsert_many([(id(1), "a"), (id(2), "b"), (id(3), "c")])
        .unwrap();
    assert_eq!(
        roster_lines(&roster),
        vec![
            "server.1=a:2888:3888",
            "server.2=b:2888:3888",
            "server.3=c:2888:3888",
        ]
    );
}

#[derive(Clone, Debug)]
enum Op {
    Upsert(u32, u8),
    Remove(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u32..8, 0u8..4).prop_map(|(id, host)| Op::Upsert(id, host)),
        (1u32..8).prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn prop_roster_invariants(ops in proptest::collection::vec(op(), 0..40)) {
        let (_dir, roster) = new_roster("tickTime=2000\n");
        // expected order of ids, maintained the way the roster should
        let mut model: Vec<(u32, u8)> = Vec::new();

        for op in ops {
            let before = fs::read_to_string(roster.path()).unwrap();

            match op {
                Op::Upsert(raw, host) => {
                    let address = format!("10.0.0.{host}");
                    roster.upsert(id(raw), &address).unwrap();

                    match model.iter_mut().find(|(m, _)| *m == raw) {
                        Some(entry) => entry.1 = host,
                        None => model.push((raw, host)),
                    }
                }
                Op::Remove(raw) => {
                    let edit = roster.remove(id(raw)).unwrap();

                    if edit == Edit::Unchanged {
                        let after = fs::read_to_string(roster.path()).unwrap();
                        prop_assert_eq!(&before, &after);
                    }
                    model.retain(|(m, _)| *m != raw);
                }
            }

            let members = roster.members().unwrap();
            let ids: Vec<u32> = members.iter().map(|m| m.id().get()).collect();
            let unique: HashSet<u32> = ids.iter().copied().collect();
            prop_assert_eq!(unique.len(), ids.len());

            let expected: Vec<(u32, String)> = model
                .iter()
                .map(|(m, host)| (*m, format!("10.0.0.{host}")))
                .collect();
            let actual: Vec<(u32, String)> = members
                .iter()
                .map(|m| (m.id().get(), m.address().to_string()))
                .collect();
            prop_assert_eq!(actual, expected);
        }

        let lines = roster_lines(&roster);
        prop_assert_eq!(lines[0].as_str(), "tickTime=2000");
    }
}
