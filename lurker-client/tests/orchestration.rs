use std::{collections::HashSet, sync::Arc};

use lurker_client::{
    api::{Error, UserId},
    NoProgress, Session,
};
use lurker_mock_server::{MockComment, MockPost, MockServer};

const RPS: u32 = 1000;

fn ids(raw: &[i64]) -> HashSet<UserId> {
    raw.iter().copied().map(UserId).collect()
}

async fn resolved(server: Arc<MockServer>) -> Session {
    let mut session = Session::new(server);
    session
        .find_group("testers")
        .await
        .expect("resolving group")
        .expect("group exists");
    session
}

#[tokio::test(start_paused = true)]
async fn inactive_is_roster_minus_active() {
    let server = Arc::new(
        MockServer::new(1, "testers")
            .with_members(&[1, 2, 3, 4, 5])
            .with_post(
                MockPost::new(10)
                    .liked_by(&[2])
                    .with_comment(MockComment::new(100, 4)),
            ),
    );
    let mut session = resolved(server).await;

    let inactive = session.find_inactive(10, RPS, &NoProgress).await.unwrap();
    assert_eq!(inactive, ids(&[1, 3, 5]));
    assert_eq!(session.inactive(), Some(&ids(&[1, 3, 5])));
}

#[tokio::test(start_paused = true)]
async fn comment_fan_out_pages_by_hundred() {
    let server = Arc::new(
        MockServer::new(1, "testers")
            .with_members(&[1])
            .with_post(
                MockPost::new(10)
                    .with_comments((0..250).map(|i| MockComment::new(1000 + i, 2000 + i))),
            ),
    );
    let mut session = resolved(server.clone()).await;

    session.find_inactive(1, RPS, &NoProgress).await.unwrap();

    let pages = server.test_calls_for("wall.getComments");
    assert_eq!(pages.len(), 3);
    let offsets: Vec<&str> = pages
        .iter()
        .map(|params| {
            params
                .iter()
                .find(|(k, _)| k == "offset")
                .map(|(_, v)| v.as_str())
                .unwrap()
        })
        .collect();
    assert_eq!(offsets, ["0", "100", "200"]);
}

#[tokio::test(start_paused = true)]
async fn exact_multiple_of_page_size_issues_one_empty_page() {
    let server = Arc::new(
        MockServer::new(1, "testers")
            .with_members(&[1])
            .with_post(
                MockPost::new(10)
                    .with_comments((0..200).map(|i| MockComment::new(1000 + i, 2000 + i))),
            ),
    );
    let mut session = resolved(server.clone()).await;

    // The trailing empty page is expected and must not fail the search.
    session.find_inactive(1, RPS, &NoProgress).await.unwrap();
    assert_eq!(server.test_call_count("wall.getComments"), 3);
}

#[tokio::test(start_paused = true)]
async fn thread_replies_feed_the_active_set() {
    let server = Arc::new(
        MockServer::new(1, "testers")
            .with_members(&[1, 2, 3, 4])
            .with_post(
                MockPost::new(10)
                    .with_comment(MockComment::new(100, 2).with_replies(&[(101, 3), (102, 4)]))
                    .with_comment(MockComment::new(110, 2)),
            ),
    );
    let mut session = resolved(server.clone()).await;

    let inactive = session.find_inactive(1, RPS, &NoProgress).await.unwrap();
    assert_eq!(inactive, ids(&[1]));

    // One page of top-level comments, one thread sub-fetch for the comment
    // that has replies, none for the one that does not.
    let thread_fetches = server
        .test_calls_for("wall.getComments")
        .into_iter()
        .filter(|params| params.iter().any(|(k, _)| k == "comment_id"))
        .count();
    assert_eq!(thread_fetches, 1);
}

#[tokio::test(start_paused = true)]
async fn zero_posts_means_everyone_is_inactive() {
    let server = Arc::new(MockServer::new(1, "testers").with_members(&[7, 8, 9]));
    let mut session = resolved(server).await;

    let inactive = session.find_inactive(50, RPS, &NoProgress).await.unwrap();
    assert_eq!(inactive, ids(&[7, 8, 9]));
}

#[tokio::test(start_paused = true)]
async fn search_is_idempotent() {
    let server = Arc::new(
        MockServer::new(1, "testers")
            .with_members(&[1, 2, 3])
            .with_post(MockPost::new(10).liked_by(&[3])),
    );
    let mut session = resolved(server).await;

    let first = session.find_inactive(5, RPS, &NoProgress).await.unwrap();
    let second = session.find_inactive(5, RPS, &NoProgress).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, ids(&[1, 2]));
}

#[tokio::test(start_paused = true)]
async fn zero_post_amount_is_rejected_before_any_call() {
    let server = Arc::new(MockServer::new(1, "testers").with_members(&[1]));
    let mut session = resolved(server.clone()).await;
    let calls_after_resolve = server.test_total_calls();

    let err = session
        .find_inactive(0, RPS, &NoProgress)
        .await
        .unwrap_err();
    assert_eq!(err, Error::InvalidPostAmount(0));
    assert_eq!(server.test_total_calls(), calls_after_resolve);
}

#[tokio::test(start_paused = true)]
async fn unknown_group_resolves_to_none() {
    let server = Arc::new(MockServer::new(1, "testers"));
    let mut session = Session::new(server);

    let name = session.find_group("nonexistent").await.unwrap();
    assert_eq!(name, None);
    assert!(session.group().is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_removals_are_tallied_not_fatal() {
    let server = Arc::new(
        MockServer::new(1, "testers")
            .with_members(&[10, 11, 12])
            .fail_removal_for(11),
    );
    let mut session = resolved(server.clone()).await;

    session.find_inactive(5, RPS, &NoProgress).await.unwrap();
    let stats = session.delete_inactive(RPS, &NoProgress).await.unwrap();

    assert_eq!(stats.removed, 2);
    assert_eq!(stats.attempted, 3);
    assert_eq!(stats.to_string(), "2 / 3");
    let mut removed = server.test_removed();
    removed.sort();
    assert_eq!(removed, vec![10, 12]);
}

#[tokio::test(start_paused = true)]
async fn delete_without_search_is_a_precondition_error() {
    let server = Arc::new(MockServer::new(1, "testers").with_members(&[1, 2]));
    let mut session = resolved(server.clone()).await;

    let err = session
        .delete_inactive(RPS, &NoProgress)
        .await
        .unwrap_err();
    assert_eq!(err, Error::NothingToSweep);
    assert_eq!(server.test_call_count("groups.removeUser"), 0);
}

#[tokio::test(start_paused = true)]
async fn users_info_resolves_screen_names() {
    let server = Arc::new(MockServer::new(1, "testers").with_members(&[5, 6]));
    let mut session = resolved(server).await;

    let inactive = session.find_inactive(1, RPS, &NoProgress).await.unwrap();
    let records = session.users_info(&inactive).await.unwrap();
    assert_eq!(records.len(), 2);
    for record in records {
        assert!(inactive.contains(&record.id));
        assert_eq!(record.screen_name.as_deref(), Some(&*format!("id{}", record.id)));
    }
}
