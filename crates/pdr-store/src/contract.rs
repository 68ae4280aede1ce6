//! Behavioural contract shared by every backing.
//!
//! `store_contract_tests!(expr)` expands to one `#[test]` per check, each
//! running against a fresh store built from `expr`.

use chrono::{DateTime, Utc};
use pdr_types::{Commit, CommitId, Did, Document, Repository, POST_KIND};
use serde_json::json;

use crate::error::StoreError;
use crate::traits::{CommitBatch, RepoStore};

macro_rules! store_contract_tests {
    ($make:expr) => {
        $crate::contract::store_contract_tests!(@tests $make;
            repository_roundtrip,
            missing_repository_is_none,
            save_repository_upserts,
            ensure_repository_keeps_existing,
            commit_roundtrip,
            save_commit_requires_repository,
            save_commit_is_idempotent,
            commits_are_scoped_by_did,
            list_repositories_is_sorted,
            document_roundtrip,
            duplicate_document_is_constraint,
            documents_by_type_filters_and_orders,
            documents_are_scoped_by_did,
            sub_second_timestamps_are_exact,
            documents_order_by_nanoseconds,
            apply_commit_advances_head,
            apply_commit_chains_commits,
            apply_commit_rejects_stale_head,
            apply_commit_rejects_duplicate_document,
            apply_commit_requires_repository,
            apply_commit_rejects_inconsistent_batch,
        );
    };
    (@tests $make:expr; $($name:ident),+ $(,)?) => {
        $(
            #[test]
            fn $name() {
                let store = $make;
                $crate::contract::$name(&store);
            }
        )+
    };
}

pub(crate) use store_contract_tests;

fn did(s: &str) -> Did {
    Did::parse(s).unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

fn at_nanos(nanos: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, nanos).unwrap()
}

fn commit(did: &Did, tag: u8, prev: CommitId, secs: i64) -> Commit {
    Commit {
        id: CommitId::from_hash([tag; 32]),
        repository_did: did.clone(),
        prev,
        data: format!("{{\"tag\":{tag}}}").into_bytes(),
        signature: None,
        created_at: at(secs),
    }
}

fn post(did: &Did, id: &str, secs: i64) -> Document {
    Document::new(did.clone(), id, POST_KIND, json!({"text": id}), at(secs))
}

fn seeded(store: &dyn RepoStore, did: &Did) -> Repository {
    let repo = Repository::new(did.clone(), at(0));
    store.save_repository(&repo).unwrap();
    repo
}

pub(crate) fn repository_roundtrip(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    let repo = seeded(store, &d);
    assert_eq!(store.get_repository(&d).unwrap(), Some(repo));
}

pub(crate) fn missing_repository_is_none(store: &dyn RepoStore) {
    assert!(store.get_repository(&did("did:plc:nobody")).unwrap().is_none());
}

pub(crate) fn save_repository_upserts(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    let mut repo = seeded(store, &d);

    repo.head = CommitId::from_hash([1; 32]);
    repo.created_at = at(99);
    repo.updated_at = at(5);
    store.save_repository(&repo).unwrap();

    let stored = store.get_repository(&d).unwrap().unwrap();
    assert_eq!(stored.head, CommitId::from_hash([1; 32]));
    assert_eq!(stored.updated_at, at(5));
    // created_at is never rewritten by an update
    assert_eq!(stored.created_at, at(0));
}

pub(crate) fn ensure_repository_keeps_existing(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    let fresh = Repository::new(d.clone(), at(0));
    assert_eq!(store.ensure_repository(&fresh).unwrap(), fresh);

    let b = batch(&d, 1, CommitId::EMPTY, "post/1", 1);
    store.apply_commit(&b).unwrap();

    // a late creator must not rewind the head
    let late = Repository::new(d.clone(), at(50));
    let stored = store.ensure_repository(&late).unwrap();
    assert_eq!(stored.head, b.commit.id);
    assert_eq!(stored.created_at, at(0));
}

pub(crate) fn commit_roundtrip(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    seeded(store, &d);
    let mut c = commit(&d, 1, CommitId::EMPTY, 1);
    c.signature = Some(vec![1, 2, 3]);
    store.save_commit(&d, &c).unwrap();

    assert_eq!(store.get_commit(&d, &c.id).unwrap(), Some(c));
    assert!(store
        .get_commit(&d, &CommitId::from_hash([42; 32]))
        .unwrap()
        .is_none());
    assert_eq!(store.count_commits(&d).unwrap(), 1);
}

pub(crate) fn save_commit_requires_repository(store: &dyn RepoStore) {
    let d = did("did:plc:ghost");
    let err = store
        .save_commit(&d, &commit(&d, 1, CommitId::EMPTY, 1))
        .unwrap_err();
    assert!(matches!(err, StoreError::RepositoryNotFound(_)));
}

pub(crate) fn save_commit_is_idempotent(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    seeded(store, &d);
    let c = commit(&d, 1, CommitId::EMPTY, 1);
    store.save_commit(&d, &c).unwrap();
    store.save_commit(&d, &c).unwrap();
    assert_eq!(store.count_commits(&d).unwrap(), 1);
}

pub(crate) fn commits_are_scoped_by_did(store: &dyn RepoStore) {
    let a = did("did:plc:alice");
    let b = did("did:plc:bob");
    seeded(store, &a);
    seeded(store, &b);
    let c = commit(&a, 1, CommitId::EMPTY, 1);
    store.save_commit(&a, &c).unwrap();

    assert!(store.get_commit(&b, &c.id).unwrap().is_none());
    assert_eq!(store.count_commits(&b).unwrap(), 0);
}

pub(crate) fn list_repositories_is_sorted(store: &dyn RepoStore) {
    seeded(store, &did("did:plc:zed"));
    seeded(store, &did("did:plc:amy"));
    assert_eq!(
        store.list_repositories().unwrap(),
        vec![did("did:plc:amy"), did("did:plc:zed")]
    );
}

pub(crate) fn document_roundtrip(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    let doc = post(&d, "post/1", 1);
    store.create_document(&doc).unwrap();
    assert_eq!(store.get_document(&d, "post/1").unwrap(), Some(doc));
    assert!(store.get_document(&d, "post/2").unwrap().is_none());
}

pub(crate) fn duplicate_document_is_constraint(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    store.create_document(&post(&d, "post/1", 1)).unwrap();

    let mut replacement = post(&d, "post/1", 2);
    replacement.value = json!({"text": "overwritten"});
    let err = store.create_document(&replacement).unwrap_err();
    assert!(matches!(err, StoreError::Constraint(_)));

    let kept = store.get_document(&d, "post/1").unwrap().unwrap();
    assert_eq!(kept.value["text"], "post/1");
}

pub(crate) fn documents_by_type_filters_and_orders(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    store.create_document(&post(&d, "post/a", 1)).unwrap();
    store.create_document(&post(&d, "post/c", 3)).unwrap();
    store.create_document(&post(&d, "post/b", 2)).unwrap();
    // same timestamp as post/c: tie broken by id, descending
    store.create_document(&post(&d, "post/d", 3)).unwrap();
    store
        .create_document(&Document::new(
            d.clone(),
            "like/1",
            "app.bsky.feed.like",
            json!({}),
            at(10),
        ))
        .unwrap();

    let ids: Vec<String> = store
        .get_documents_by_type(&d, POST_KIND)
        .unwrap()
        .into_iter()
        .map(|doc| doc.id)
        .collect();
    assert_eq!(ids, vec!["post/d", "post/c", "post/b", "post/a"]);

    assert!(store
        .get_documents_by_type(&d, "app.bsky.feed.repost")
        .unwrap()
        .is_empty());
}

pub(crate) fn documents_are_scoped_by_did(store: &dyn RepoStore) {
    let a = did("did:plc:alice");
    let b = did("did:plc:bob");
    store.create_document(&post(&a, "post/1", 1)).unwrap();
    // same document id under another DID is a distinct key
    store.create_document(&post(&b, "post/1", 1)).unwrap();

    let docs = store.get_documents_by_type(&b, POST_KIND).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].repository_did, b);
}

pub(crate) fn sub_second_timestamps_are_exact(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    let repo = Repository::new(d.clone(), at_nanos(123_456_789));
    store.save_repository(&repo).unwrap();
    assert_eq!(store.get_repository(&d).unwrap(), Some(repo));

    let mut c = commit(&d, 1, CommitId::EMPTY, 0);
    c.created_at = at_nanos(987_654_321);
    store.save_commit(&d, &c).unwrap();
    assert_eq!(store.get_commit(&d, &c.id).unwrap(), Some(c));

    let doc = Document::new(d.clone(), "post/1", POST_KIND, json!({}), at_nanos(1));
    store.create_document(&doc).unwrap();
    assert_eq!(store.get_document(&d, "post/1").unwrap(), Some(doc));
}

pub(crate) fn documents_order_by_nanoseconds(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    // within one microsecond; id order is the reverse of time order
    let older = Document::new(d.clone(), "post/b", POST_KIND, json!({}), at_nanos(100));
    let newer = Document::new(d.clone(), "post/a", POST_KIND, json!({}), at_nanos(900));
    store.create_document(&older).unwrap();
    store.create_document(&newer).unwrap();

    let ids: Vec<String> = store
        .get_documents_by_type(&d, POST_KIND)
        .unwrap()
        .into_iter()
        .map(|doc| doc.id)
        .collect();
    assert_eq!(ids, vec!["post/a", "post/b"]);
}

fn batch(d: &Did, tag: u8, expected_head: CommitId, doc_id: &str, secs: i64) -> CommitBatch {
    CommitBatch {
        did: d.clone(),
        expected_head,
        document: post(d, doc_id, secs),
        commit: commit(d, tag, expected_head, secs),
    }
}

pub(crate) fn apply_commit_advances_head(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    seeded(store, &d);
    let b = batch(&d, 1, CommitId::EMPTY, "post/1", 1);

    let repo = store.apply_commit(&b).unwrap();
    assert_eq!(repo.head, b.commit.id);
    assert_eq!(repo.updated_at, at(1));
    assert_eq!(store.get_repository(&d).unwrap(), Some(repo));
    assert_eq!(store.get_commit(&d, &b.commit.id).unwrap(), Some(b.commit));
    assert_eq!(store.get_document(&d, "post/1").unwrap(), Some(b.document));
}

pub(crate) fn apply_commit_chains_commits(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    seeded(store, &d);
    let first = batch(&d, 1, CommitId::EMPTY, "post/1", 1);
    store.apply_commit(&first).unwrap();
    let second = batch(&d, 2, first.commit.id, "post/2", 2);
    let repo = store.apply_commit(&second).unwrap();

    assert_eq!(repo.head, second.commit.id);
    let stored = store.get_commit(&d, &second.commit.id).unwrap().unwrap();
    assert_eq!(stored.prev, first.commit.id);
    assert_eq!(store.count_commits(&d).unwrap(), 2);
}

pub(crate) fn apply_commit_rejects_stale_head(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    seeded(store, &d);
    let winner = batch(&d, 1, CommitId::EMPTY, "post/1", 1);
    store.apply_commit(&winner).unwrap();

    // built against the same (now stale) empty head
    let loser = batch(&d, 2, CommitId::EMPTY, "post/2", 1);
    let err = store.apply_commit(&loser).unwrap_err();
    assert!(err.is_conflict());

    assert_eq!(store.get_repository(&d).unwrap().unwrap().head, winner.commit.id);
    assert!(store.get_document(&d, "post/2").unwrap().is_none());
    assert!(store.get_commit(&d, &loser.commit.id).unwrap().is_none());
    assert_eq!(store.count_commits(&d).unwrap(), 1);
}

pub(crate) fn apply_commit_rejects_duplicate_document(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    seeded(store, &d);
    store.create_document(&post(&d, "post/1", 0)).unwrap();

    let b = batch(&d, 1, CommitId::EMPTY, "post/1", 1);
    let err = store.apply_commit(&b).unwrap_err();
    assert!(matches!(err, StoreError::Constraint(_)));

    assert!(store.get_repository(&d).unwrap().unwrap().head.is_empty());
    assert!(store.get_commit(&d, &b.commit.id).unwrap().is_none());
}

pub(crate) fn apply_commit_requires_repository(store: &dyn RepoStore) {
    let d = did("did:plc:ghost");
    let b = batch(&d, 1, CommitId::EMPTY, "post/1", 1);
    let err = store.apply_commit(&b).unwrap_err();
    assert!(matches!(err, StoreError::RepositoryNotFound(_)));
    assert!(store.get_document(&d, "post/1").unwrap().is_none());
}

pub(crate) fn apply_commit_rejects_inconsistent_batch(store: &dyn RepoStore) {
    let d = did("did:plc:alice");
    seeded(store, &d);
    let mut b = batch(&d, 1, CommitId::EMPTY, "post/1", 1);
    b.commit.prev = CommitId::from_hash([7; 32]);
    assert!(matches!(
        store.apply_commit(&b).unwrap_err(),
        StoreError::Constraint(_)
    ));

    let mut b = batch(&d, 1, CommitId::EMPTY, "post/1", 1);
    b.document.repository_did = did("did:plc:other");
    assert!(matches!(
        store.apply_commit(&b).unwrap_err(),
        StoreError::Constraint(_)
    ));
    assert_eq!(store.count_commits(&d).unwrap(), 0);
}
