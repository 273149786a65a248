//! Durability and recovery tests.

use postboard_core::{CoreError, Database, EntityId, Post, Position, Team, User};
use postboard_testkit::prelude::*;
use std::fs::OpenOptions;
use std::io::Write;

#[test]
fn committed_rows_survive_reopen() {
    let test_db = TestDatabase::file();
    Team::insert_teams(&test_db).unwrap();
    Position::insert_positions(&test_db).unwrap();
    let id = insert_post(&test_db, "help", "post from john");

    let test_db = test_db.reopen();
    assert_eq!(test_db.table::<Team>().count(), 3);
    assert_eq!(test_db.table::<Position>().count(), 4);
    let post = test_db.table::<Post>().get(id).unwrap().unwrap();
    assert_eq!(post.title, "help");
}

#[test]
fn uncommitted_rows_are_lost() {
    let test_db = TestDatabase::file();
    insert_post(&test_db, "kept", "yes");

    let mut txn = test_db.begin();
    test_db
        .table::<Post>()
        .insert(&mut txn, &mut Post::new("lost", "no"))
        .unwrap();
    drop(txn);

    let test_db = test_db.reopen();
    let titles: Vec<_> = test_db
        .table::<Post>()
        .scan_all()
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["kept"]);
}

#[test]
fn torn_tail_is_discarded_on_open() {
    let test_db = TestDatabase::file();
    insert_post(&test_db, "kept", "yes");
    let size = test_db.journal_size().unwrap();
    let journal = test_db.path().unwrap().join("journal.log");

    // half a frame, as left by a crash mid-append
    let mut file = OpenOptions::new().append(true).open(&journal).unwrap();
    file.write_all(b"PBJL\x01\x00\xff\x00\x00\x00partial").unwrap();
    drop(file);

    let test_db = test_db.reopen();
    assert_eq!(test_db.table::<Post>().count(), 1);
    assert_eq!(test_db.journal_size().unwrap(), size);

    // and the journal is appendable again
    insert_post(&test_db, "after", "crash");
    let test_db = test_db.reopen();
    assert_eq!(test_db.table::<Post>().count(), 2);
}

#[test]
fn corruption_before_tail_fails_open() {
    let test_db = TestDatabase::file();
    insert_post(&test_db, "one", "1");
    insert_post(&test_db, "two", "2");
    let dir = test_db.close().unwrap();
    let journal = dir.path().join("journal.log");

    // damage the first of two frames
    let mut bytes = std::fs::read(&journal).unwrap();
    bytes[12] ^= 0xff;
    std::fs::write(&journal, bytes).unwrap();

    let result = Database::open(dir.path());
    assert!(matches!(
        result,
        Err(CoreError::JournalCorruption { offset: 0, .. })
    ));
}

#[test]
fn ids_continue_after_reopen() {
    let test_db = TestDatabase::file();
    let first = insert_post(&test_db, "a", "a");
    let second = insert_post(&test_db, "b", "b");
    delete_post(&test_db, second);

    let test_db = test_db.reopen();
    let third = insert_post(&test_db, "c", "c");
    assert_eq!(first, EntityId::new(1));
    assert_eq!(third, EntityId::new(3));
}

#[test]
fn second_open_is_locked() {
    with_file_db(|_db, path| {
        assert!(matches!(
            Database::open(path),
            Err(CoreError::DatabaseLocked)
        ));
    });
}

#[test]
fn passwords_survive_reopen() {
    let test_db = TestDatabase::file();
    let id = test_db
        .transaction(|txn| {
            let mut susan = User::new("susan", "susan@example.com");
            susan.set_password("cat")?;
            test_db.table::<User>().insert(txn, &mut susan)
        })
        .unwrap();

    let test_db = test_db.reopen();
    let susan = test_db.table::<User>().get(id).unwrap().unwrap();
    assert!(susan.check_password("cat"));
    assert!(!susan.check_password("dog"));
}
