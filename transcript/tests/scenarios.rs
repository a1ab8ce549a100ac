mod common;

use std::time::Duration;

use synod::Control;
use transcript::{choose_instance, Error, Line};

use crate::common::{eventually, fixed, no_oracle, slow, Cluster, FOLLOWER_1, FOLLOWER_2, LEADER};

const MEMBERS: [&str; 3] = [LEADER, FOLLOWER_1, FOLLOWER_2];

#[tokio::test]
async fn chosen_answer_reaches_every_node() {
    let cluster = Cluster::answering("4", "four", "4");
    cluster.operator("create c1").await;
    assert!(eventually(|| MEMBERS.iter().all(|id| cluster.answers(id, "c1") == Some(0))).await);

    cluster.operator("query c1 what is 2+2?").await;
    assert!(eventually(|| cluster.candidates("c1") == 3).await);

    cluster.operator(&format!("choose c1 {}", LEADER)).await;
    assert!(eventually(|| MEMBERS.iter().all(|id| cluster.answers(id, "c1") == Some(1))).await);

    for id in MEMBERS.iter() {
        cluster.server(id).node().read(|store| {
            assert_eq!(store.context("c1").unwrap().lines(), &[
                Line::Query("what is 2+2?".into()),
                Line::Answer("4".into()),
            ]);
        });
        assert_eq!(
            cluster.server(id).view("c1"),
            "-------- CONTEXT c1 --------\nQuery: what is 2+2?\nAnswer: 4\n-------------------------------",
        );
    }
    assert_eq!(cluster.candidates("c1"), 0);
}

#[tokio::test]
async fn follower_candidate_can_be_chosen() {
    let cluster = Cluster::answering("4", "four", "4");
    cluster.operator("create c1").await;
    assert!(eventually(|| MEMBERS.iter().all(|id| cluster.answers(id, "c1") == Some(0))).await);
    cluster.operator("query c1 what is 2+2?").await;
    assert!(eventually(|| cluster.candidates("c1") == 3).await);

    cluster.operator(&format!("choose c1 {}", FOLLOWER_1)).await;
    assert!(eventually(|| MEMBERS.iter().all(|id| cluster.answers(id, "c1") == Some(1))).await);
    cluster.server(FOLLOWER_2).node().read(|store| {
        assert_eq!(store.context("c1").unwrap().lines().last(), Some(&Line::Answer("four".into())));
    });
}

#[tokio::test]
async fn cut_off_follower_misses_the_context() {
    let cluster = Cluster::answering("4", "4", "4");
    cluster.operator(&format!("failLink {} {}", LEADER, FOLLOWER_2)).await;
    cluster.operator("create c1").await;

    assert!(eventually(|| cluster.answers(LEADER, "c1").is_some() && cluster.answers(FOLLOWER_1, "c1").is_some()).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cluster.answers(FOLLOWER_2, "c1"), None);

    // Queries on the missing context fail locally.
    assert!(matches!(
        cluster.server(FOLLOWER_2).query("c1", "2+2").await,
        Err(Error::UnknownContext(_)),
    ));
}

#[tokio::test]
async fn commit_survives_a_follower_failing_mid_round() {
    let cluster = Cluster::answering("4", "four", "4");
    cluster.operator("create c1").await;
    assert!(eventually(|| MEMBERS.iter().all(|id| cluster.answers(id, "c1") == Some(0))).await);
    cluster.operator("query c1 what is 2+2?").await;
    assert!(eventually(|| cluster.candidates("c1") == 3).await);

    let instance = choose_instance("c1", 0);
    cluster.kill_after(FOLLOWER_1, &format!("prepare {} ", instance));
    cluster.operator(&format!("choose c1 {}", LEADER)).await;

    assert!(eventually(|| cluster.answers(LEADER, "c1") == Some(1) && cluster.answers(FOLLOWER_2, "c1") == Some(1)).await);
    assert!(cluster.is_dead(FOLLOWER_1));
    let promised = cluster.server(FOLLOWER_1).node().instance(&instance).and_then(|state| state.promised);
    assert!(promised.is_some(), "follower died before joining the round");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cluster.answers(FOLLOWER_1, "c1"), Some(0));
    assert_eq!(cluster.server(FOLLOWER_1).node().decision(&instance), None);
}

#[tokio::test]
async fn commit_survives_a_follower_killed_alongside_choose() {
    let cluster = Cluster::answering("4", "four", "4");
    cluster.operator("create c1").await;
    assert!(eventually(|| MEMBERS.iter().all(|id| cluster.answers(id, "c1") == Some(0))).await);
    cluster.operator("query c1 what is 2+2?").await;
    assert!(eventually(|| cluster.candidates("c1") == 3).await);

    cluster.operator(&format!("choose c1 {}", LEADER)).await;
    cluster.operator(&format!("failNode {}", FOLLOWER_1)).await;

    assert!(eventually(|| cluster.answers(LEADER, "c1") == Some(1) && cluster.answers(FOLLOWER_2, "c1") == Some(1)).await);
    assert!(eventually(|| cluster.is_dead(FOLLOWER_1)).await);
}

#[tokio::test]
async fn late_candidates_do_not_leak_into_the_next_round() {
    let cluster = Cluster::start([fixed("4"), fixed("four"), slow(Duration::from_millis(400), "stale")]);
    cluster.operator("create c1").await;
    assert!(eventually(|| MEMBERS.iter().all(|id| cluster.answers(id, "c1") == Some(0))).await);
    cluster.operator("query c1 what is 2+2?").await;
    assert!(eventually(|| cluster.candidates("c1") == 2).await);

    cluster.operator(&format!("choose c1 {}", LEADER)).await;
    assert!(eventually(|| cluster.answers(LEADER, "c1") == Some(1)).await);

    // Follower 2's answer to the settled question arrives now.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(cluster.candidates("c1"), 0);
    assert!(matches!(
        cluster.server(LEADER).choose("c1", &FOLLOWER_2.into()).await,
        Err(Error::NoCandidate { .. }),
    ));
    assert!(MEMBERS.iter().all(|id| cluster.answers(id, "c1") == Some(1)));
}

#[tokio::test]
async fn missing_candidates_do_not_block_the_others() {
    let cluster = Cluster::start([fixed("4"), no_oracle(), fixed("four")]);
    cluster.operator("create c1").await;
    assert!(eventually(|| MEMBERS.iter().all(|id| cluster.answers(id, "c1") == Some(0))).await);
    cluster.operator("query c1 what is 2+2?").await;
    assert!(eventually(|| cluster.candidates("c1") == 2).await);

    let leader = cluster.server(LEADER);
    assert!(matches!(
        leader.choose("c1", &FOLLOWER_1.into()).await,
        Err(Error::NoCandidate { .. }),
    ));
    let chosen = leader.choose("c1", &FOLLOWER_2.into()).await.unwrap();
    assert_eq!(chosen.to_string(), "answer c1 four");
    assert!(eventually(|| MEMBERS.iter().all(|id| cluster.answers(id, "c1") == Some(1))).await);
}

#[tokio::test]
async fn followers_ignore_leader_commands() {
    let cluster = Cluster::answering("4", "4", "4");
    let follower = cluster.server(FOLLOWER_1);
    assert_eq!(follower.handle_line("create c1"), Control::Continue);
    tokio::time::sleep(Duration::from_millis(100)).await;
    for id in MEMBERS.iter() {
        assert_eq!(cluster.answers(id, "c1"), None);
    }
}

#[tokio::test]
async fn malformed_lines_are_ignored() {
    let cluster = Cluster::answering("4", "4", "4");
    let leader = cluster.server(LEADER);
    for line in &["", "prepare", "accept create-c1 x y", "commit create-c1 answer", "launch missiles"] {
        assert_eq!(leader.handle_line(line), Control::Continue);
    }
    assert_eq!(leader.view_all(), "======= ALL CONTEXTS =======\n================================");
}

#[tokio::test]
async fn answers_accumulate_in_order() {
    let cluster = Cluster::answering("yes", "no", "maybe");
    cluster.operator("create c1").await;
    assert!(eventually(|| MEMBERS.iter().all(|id| cluster.answers(id, "c1") == Some(0))).await);

    for (round, node) in [LEADER, FOLLOWER_2].iter().enumerate() {
        cluster.operator("query c1 well?").await;
        assert!(eventually(|| cluster.candidates("c1") == 3).await);
        cluster.operator(&format!("choose c1 {}", node)).await;
        assert!(eventually(|| MEMBERS.iter().all(|id| cluster.answers(id, "c1") == Some(round + 1))).await);
    }
    cluster.server(FOLLOWER_1).node().read(|store| {
        let answers: Vec<_> = store.context("c1")
            .unwrap()
            .lines()
            .iter()
            .filter_map(|line| match line {
            | Line::Answer(text) => Some(text.clone()),
            | Line::Query(_) => None,
            })
            .collect();
        assert_eq!(answers, vec!["yes".to_string(), "maybe".to_string()]);
    });
}
