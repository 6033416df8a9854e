//! Repository CRUD protocol against a scripted connection.

#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use anyhow::anyhow;
use common::{
    Membership, MockConnection, RecordingLogger, Reply, Tag, User, mock_source, mock_source_with,
    row, user_row,
};
use tabula_orm::{DataSource, DataType, Error, Id, MySql, Op, Record, Repository, Sqlite};

fn repo<E: tabula_orm::Entity>(mock: &Arc<MockConnection>) -> Repository<E> {
    Repository::new(&mock_source(mock)).unwrap()
}

fn tag_row(name: &str, hits: i64) -> tabula_orm::Row {
    row(&[("name", DataType::Str(Some(name.to_string()))), ("hits", DataType::Int64(Some(hits)))])
}

// Insert family

#[test]
fn save_reads_back_generated_id() {
    let mock = MockConnection::scripted([
        Reply::Affected(1),
        Reply::Rows(vec![row(&[("last_insert_rowid()", DataType::Int64(Some(7)))])]),
        Reply::Rows(vec![user_row(7, "ada", 0)]),
    ]);
    let users = repo::<User>(&mock);

    let saved = users.save(&User::new("ada", 0)).unwrap().unwrap();

    assert_eq!(saved.id, Some(7));
    assert_eq!(saved.name, "ada");
    assert_eq!(saved.visits, 0);
    assert_eq!(
        mock.statements(),
        [
            r#"INSERT INTO "users" ("name","visits") VALUES (?,?)"#,
            "SELECT last_insert_rowid()",
            r#"SELECT * FROM "users" WHERE "id"=?"#,
        ]
    );
    assert_eq!(mock.params(2), vec![DataType::Int64(Some(7))]);
}

#[test]
fn save_with_supplied_id_skips_last_insert_id() {
    let mock = MockConnection::scripted([
        Reply::Affected(1),
        Reply::Rows(vec![user_row(40, "ada", 1)]),
    ]);
    let users = repo::<User>(&mock);
    let ada = User {
        id: Some(40),
        ..User::new("ada", 1)
    };

    let saved = users.save(&ada).unwrap();

    assert_eq!(saved, Some(ada));
    assert_eq!(
        mock.statements(),
        [
            r#"INSERT INTO "users" ("id","name","visits") VALUES (?,?,?)"#,
            r#"SELECT * FROM "users" WHERE "id"=?"#,
        ]
    );
}

#[test]
fn save_with_no_affected_rows_returns_none() {
    let mock = MockConnection::scripted([Reply::Affected(0)]);

    let saved = repo::<User>(&mock).save(&User::new("ada", 0)).unwrap();

    assert_eq!(saved, None);
    assert_eq!(mock.statements().len(), 1);
}

#[test]
fn save_with_expression() {
    let mock = MockConnection::scripted([Reply::Affected(1)]);
    let record = Record::new().set("name", "ada").set("visits", Op::null());

    let _ = repo::<User>(&mock).save(&record);

    assert_eq!(mock.statements()[0], r#"INSERT INTO "users" ("name","visits") VALUES (?,NULL)"#);
    assert_eq!(mock.params(0), vec![DataType::Str(Some("ada".to_string()))]);
}

#[test]
fn save_needs_values() {
    let mock = MockConnection::scripted([]);

    let err = repo::<User>(&mock).save(&Record::new()).unwrap_err();

    assert!(matches!(err, Error::Schema(ref msg) if msg == "no value"));
    assert!(mock.statements().is_empty());
}

#[test]
fn save_rejects_update_only_op() {
    let mock = MockConnection::scripted([]);
    let record = Record::new().set("name", "ada").set("visits", Op::inc());

    let err = repo::<User>(&mock).save(&record).unwrap_err();
    assert!(matches!(err, Error::OperationNotSupported { op: "increment", .. }));
}

#[test]
fn save_without_generated_column_matches_by_example() {
    let mock = MockConnection::scripted([
        Reply::Affected(1),
        Reply::Rows(vec![tag_row("rust", 3)]),
    ]);
    let tags = repo::<Tag>(&mock);

    let saved = tags.save(&Tag { name: "rust".to_string(), hits: 3 }).unwrap();

    assert_eq!(saved, Some(Tag { name: "rust".to_string(), hits: 3 }));
    assert_eq!(mock.statements()[1], r#"SELECT * FROM "tags" WHERE "name"=? AND "hits"=?"#);
}

#[test]
fn save_by_example_requires_exactly_one_match() {
    let tag = Tag { name: "rust".to_string(), hits: 3 };

    let mock = MockConnection::scripted([Reply::Affected(1), Reply::Rows(vec![])]);
    let err = repo::<Tag>(&mock).save(&tag).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let mock = MockConnection::scripted([
        Reply::Affected(1),
        Reply::Rows(vec![tag_row("rust", 3), tag_row("rust", 3)]),
    ]);
    let err = repo::<Tag>(&mock).save(&tag).unwrap_err();
    assert!(matches!(err, Error::AmbiguousResult { count: 2, .. }));
}

#[test]
fn insert_verbs_follow_dialect() {
    let mock = MockConnection::scripted([Reply::Affected(0), Reply::Affected(0)]);
    let users = repo::<User>(&mock);
    users.save_or_ignore(&User::new("ada", 0)).unwrap();
    users.save_or_overwrite(&User::new("ada", 0)).unwrap();

    let statements = mock.statements();
    assert!(statements[0].starts_with(r#"INSERT OR IGNORE INTO "users""#), "{}", statements[0]);
    assert!(statements[1].starts_with(r#"REPLACE INTO "users""#), "{}", statements[1]);

    let mock = MockConnection::scripted([Reply::Affected(0)]);
    let users = Repository::<User>::new(&mock_source_with(&mock, MySql)).unwrap();
    users.save_or_ignore(&User::new("ada", 0)).unwrap();
    assert_eq!(
        mock.statements()[0],
        "INSERT IGNORE INTO `users` (`name`,`visits`) VALUES (?,?)"
    );
}

#[test]
fn save_or_update_appends_upsert() {
    let mock = MockConnection::scripted([Reply::Affected(0)]);
    let users = repo::<User>(&mock);
    let ada = User {
        id: Some(3),
        ..User::new("ada", 1)
    };
    let bump = Record::new().set("id", 99).set("visits", Op::inc());

    users.save_or_update(&ada, Some(&bump)).unwrap();

    assert_eq!(
        mock.statements()[0],
        r#"INSERT INTO "users" ("id","name","visits") VALUES (?,?,?) ON CONFLICT ("id") DO UPDATE SET "visits"="visits"+1"#
    );
    assert_eq!(mock.params(0).len(), 3);
}

#[test]
fn save_or_update_defaults_to_inserted_values() {
    let mock = MockConnection::scripted([Reply::Affected(0)]);
    let users = Repository::<User>::new(&mock_source_with(&mock, MySql)).unwrap();
    let ada = User {
        id: Some(3),
        ..User::new("ada", 1)
    };

    users.save_or_update(&ada, None).unwrap();

    assert_sql(
        &mock.statements()[0],
        "INSERT INTO `users` (`id`,`name`,`visits`) VALUES (?,?,?) \
         ON DUPLICATE KEY UPDATE `name`=?, `visits`=?",
    );
    assert_eq!(mock.params(0).len(), 5);
}

fn assert_sql(actual: &str, expected: &str) {
    common::assert_sql_contains(actual, &[expected]);
}

// Update

#[test]
fn update_sets_non_key_fields() {
    let mock = MockConnection::scripted([
        Reply::Affected(1),
        Reply::Rows(vec![user_row(3, "ada", 9)]),
    ]);
    let users = repo::<User>(&mock);
    let ada = User {
        id: Some(3),
        ..User::new("ada", 9)
    };

    let updated = users.update(&ada, None).unwrap();

    assert_eq!(updated, Some(ada));
    assert_eq!(
        mock.statements(),
        [
            r#"UPDATE "users" SET "name"=?, "visits"=? WHERE "id"=?"#,
            r#"SELECT * FROM "users" WHERE "id"=?"#,
        ]
    );
    assert_eq!(
        mock.params(0),
        vec![
            DataType::Str(Some("ada".to_string())),
            DataType::Int64(Some(9)),
            DataType::Int64(Some(3)),
        ]
    );
}

#[test]
fn update_with_explicit_fields() {
    let mock = MockConnection::scripted([Reply::Affected(1)]);
    let users = repo::<User>(&mock);
    let key = Record::new().set("id", 3);

    let updated = users.update(&key, Some(&Record::new().set("visits", Op::add(2)))).unwrap();

    // read-back found nothing: logged, not raised
    assert_eq!(updated, None);
    assert_eq!(mock.statements()[0], r#"UPDATE "users" SET "visits"="visits"+? WHERE "id"=?"#);
    assert_eq!(mock.params(0), vec![DataType::Int32(Some(2)), DataType::Int32(Some(3))]);
}

#[test]
fn update_ignores_key_only_fields() {
    let mock = MockConnection::scripted([Reply::Affected(1)]);
    let users = repo::<User>(&mock);
    let ada = User {
        id: Some(3),
        ..User::new("ada", 9)
    };

    users.update(&ada, Some(&Record::new().set("id", 4))).unwrap();

    assert_eq!(mock.statements()[0], r#"UPDATE "users" SET "name"=?, "visits"=? WHERE "id"=?"#);
    assert_eq!(mock.params(0)[2], DataType::Int64(Some(3)));
}

#[test]
fn update_requires_primary_key() {
    let mock = MockConnection::scripted([]);

    let err = repo::<User>(&mock).update(&User::new("ada", 1), None).unwrap_err();

    assert!(matches!(err, Error::MissingPrimaryKey { ref column, .. } if column == "id"));
    assert!(mock.statements().is_empty());
}

#[test]
fn update_needs_values() {
    let mock = MockConnection::scripted([]);

    let err = repo::<User>(&mock).update(&Record::new().set("id", 1), None).unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
}

#[test]
fn conditional_update_by_any_condition() {
    let mock = MockConnection::scripted([Reply::Affected(4)]);

    let updated = repo::<User>(&mock)
        .conditional_update(Record::new().set("name", "ada"), &Record::new().set("visits", 0))
        .unwrap();

    assert_eq!(updated, 4);
    assert_eq!(mock.statements()[0], r#"UPDATE "users" SET "visits"=? WHERE "name"=?"#);
}

// Delete and find

#[test]
fn delete_by_entity_and_id() {
    let mock = MockConnection::scripted([Reply::Affected(1), Reply::Affected(0)]);
    let users = repo::<User>(&mock);
    let ada = User {
        id: Some(5),
        ..User::new("ada", 1)
    };

    assert_eq!(users.delete(&ada).unwrap(), 1);
    assert_eq!(users.delete_by_id(6).unwrap(), 0);

    assert_eq!(
        mock.statements(),
        [r#"DELETE FROM "users" WHERE "id"=?"#, r#"DELETE FROM "users" WHERE "id"=?"#]
    );
    assert_eq!(mock.params(1), vec![DataType::Int32(Some(6))]);
}

#[test]
fn composite_key_in_declared_order() {
    let mock = MockConnection::scripted([Reply::Affected(1)]);
    let memberships = repo::<Membership>(&mock);

    let deleted = memberships.delete_by_id(Id::named([("user_id", 2), ("group_id", 1)])).unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(
        mock.statements()[0],
        r#"DELETE FROM "memberships" WHERE "group_id"=? AND "user_id"=?"#
    );
    assert_eq!(mock.params(0), vec![DataType::Int32(Some(1)), DataType::Int32(Some(2))]);
}

#[test]
fn key_shape_mismatches() {
    let mock = MockConnection::scripted([]);
    let memberships = repo::<Membership>(&mock);
    let users = repo::<User>(&mock);

    let err = memberships.delete_by_id(1).unwrap_err();
    assert!(matches!(err, Error::CompositeKeyMismatch { .. }));

    let err = memberships.find_by_id(Id::named([("group_id", 1)])).unwrap_err();
    assert!(matches!(err, Error::CompositeKeyMismatch { ref message, .. } if message.contains("user_id")));

    let err = users.find_by_id(Id::named([("id", 1)])).unwrap_err();
    assert!(matches!(err, Error::KeyTypeMismatch { .. }));

    let err = memberships.delete(&Record::new().set("group_id", 1)).unwrap_err();
    assert!(matches!(err, Error::CompositeKeyMismatch { ref message, .. } if message.contains("user_id")));

    let err = users.delete(&User::new("ada", 1)).unwrap_err();
    assert!(matches!(err, Error::MissingPrimaryKey { ref column, .. } if column == "id"));

    assert!(mock.statements().is_empty());
}

#[test]
fn find_by_id_outcomes() {
    let mock = MockConnection::scripted([
        Reply::Rows(vec![]),
        Reply::Rows(vec![user_row(1, "ada", 0)]),
        Reply::Rows(vec![user_row(1, "ada", 0), user_row(1, "bob", 0)]),
    ]);
    let users = repo::<User>(&mock);

    assert_eq!(users.find_by_id(1).unwrap(), None);
    assert_eq!(users.find_by_id(1).unwrap().map(|u| u.name), Some("ada".to_string()));

    let err = users.find_by_id(1).unwrap_err();
    assert!(matches!(err, Error::IntegrityViolation { count: 2, .. }));
}

#[test]
fn find_requires_every_key_column() {
    let mock = MockConnection::scripted([Reply::Rows(vec![])]);
    let memberships = repo::<Membership>(&mock);

    let err = memberships.find(&Record::new().set("group_id", 1)).unwrap_err();
    assert!(matches!(err, Error::MissingPrimaryKey { ref column, .. } if column == "user_id"));

    let found = memberships.find(&Record::new().set("group_id", 1).set("user_id", 2)).unwrap();
    assert!(found.is_empty());
}

#[test]
fn find_by_example_and_all() {
    let mock = MockConnection::scripted([Reply::Rows(vec![]), Reply::Rows(vec![])]);
    let users = repo::<User>(&mock);

    users.find_by_example(&User::new("ada", 2)).unwrap();
    users.find_all().unwrap();

    assert_eq!(
        mock.statements(),
        [r#"SELECT * FROM "users" WHERE "name"=? AND "visits"=?"#, r#"SELECT * FROM "users""#]
    );
}

// Transactions and logging

#[test]
fn transaction_commits() {
    let mock = MockConnection::scripted([Reply::Affected(1)]);
    let users = repo::<User>(&mock);

    let deleted = users.transaction(|repo| Ok(repo.delete_by_id(1)?)).unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(mock.statements(), ["BEGIN", r#"DELETE FROM "users" WHERE "id"=?"#, "COMMIT"]);
}

#[test]
fn failed_commit_rolls_back() {
    let mock = MockConnection::failing_commit([Reply::Affected(1)]);
    let users = repo::<User>(&mock);

    let err = users.transaction(|repo| Ok(repo.delete_by_id(1)?)).unwrap_err();

    assert!(matches!(err, Error::Driver { ref statement, .. } if statement == "COMMIT"));
    assert_eq!(
        mock.statements(),
        ["BEGIN", r#"DELETE FROM "users" WHERE "id"=?"#, "COMMIT", "ROLLBACK"]
    );
}

#[test]
fn transaction_rolls_back_and_wraps_foreign_errors() {
    let mock = MockConnection::scripted([Reply::Affected(1)]);
    let users = repo::<User>(&mock);

    let err = users
        .transaction(|repo| -> anyhow::Result<()> {
            repo.delete_by_id(1)?;
            Err(anyhow!("boom"))
        })
        .unwrap_err();

    assert!(matches!(err, Error::Transaction(ref source) if source.to_string() == "boom"));
    assert_eq!(mock.statements(), ["BEGIN", r#"DELETE FROM "users" WHERE "id"=?"#, "ROLLBACK"]);
}

#[test]
fn transaction_rethrows_own_errors() {
    let mock = MockConnection::scripted([]);
    let users = repo::<User>(&mock);

    let err = users.transaction(|repo| Ok(repo.save(&Record::new())?)).unwrap_err();

    assert!(matches!(err, Error::Schema(_)));
    assert_eq!(mock.statements(), ["BEGIN", "ROLLBACK"]);
}

#[test]
fn driver_failure_is_wrapped_with_statement() {
    let mock = MockConnection::scripted([Reply::Fail("disk I/O error")]);

    let err = repo::<User>(&mock).delete_by_id(1).unwrap_err();

    let Error::Driver { statement, source } = err else {
        panic!("expected a driver error");
    };
    assert_eq!(statement, r#"DELETE FROM "users" WHERE "id"=?"#);
    assert_eq!(source.to_string(), "disk I/O error");
}

#[test]
fn logger_sees_one_outcome_per_statement() {
    let mock = MockConnection::scripted([
        Reply::Rows(vec![user_row(1, "ada", 0)]),
        Reply::Affected(1),
        Reply::Fail("locked"),
    ]);
    let logger = RecordingLogger::default();
    let source = DataSource::new(Arc::clone(&mock), Sqlite).with_logger(logger.clone());
    let users = Repository::<User>::new(&source).unwrap();

    users.find_by_id(1).unwrap();
    users.delete_by_id(1).unwrap();
    users.delete_by_id(2).unwrap_err();

    let select = r#"SELECT * FROM "users" WHERE "id"=?"#;
    let delete = r#"DELETE FROM "users" WHERE "id"=?"#;
    assert_eq!(
        logger.events(),
        [
            format!("before {select}"),
            format!("query {select} -> 1"),
            format!("before {delete}"),
            format!("update {delete} -> true"),
            format!("before {delete}"),
            format!("exception failed to execute `{delete}`: locked"),
        ]
    );
}
