//! Edit application through the library service

mod helpers;

use chrono::Utc;
use helpers::*;
use quizshelf_common::{Error, FixedClock};
use quizshelf_library::edit::{apply, optimize};
use quizshelf_library::models::{Edit, Frame, KeyedFrame, LeafFrame, Quiz, TextFrame};
use quizshelf_library::Library;

async fn text_row_count(library: &Library) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM text_frame")
        .fetch_one(library.pool())
        .await
        .unwrap()
}

fn text_content(frame: &LeafFrame) -> &str {
    match frame {
        LeafFrame::Text(text) => &text.content,
        other => panic!("expected text, got {:?}", other),
    }
}

#[tokio::test]
async fn test_options_update_removes_two_and_inserts_one() {
    let (_temp_dir, _paths, library) = open_library().await.unwrap();
    let quiz_id = library
        .import_single(pack_bytes(
            vec![quiz(
                "Choice",
                vec![options(
                    "abc",
                    vec![
                        option_text("A", true, 0),
                        option_text("B", false, 1),
                        option_text("C", false, 2),
                    ],
                )],
            )],
            &[],
        ))
        .await
        .unwrap();

    let stored = library.get_quiz(quiz_id).await.unwrap().unwrap();
    let Frame::Options(old) = stored.frames[0].clone() else {
        panic!("expected options frame");
    };
    let a = old.frames[0].clone();
    let removed_ids: Vec<i64> = old.frames[1..].iter().map(|k| k.frame.id()).collect();

    let mut new = old.clone();
    new.frames = vec![
        a.clone(),
        KeyedFrame {
            frame: LeafFrame::Text(TextFrame {
                id: -1,
                content: "D".to_string(),
            }),
            is_key: false,
            priority: 1,
        },
    ];
    library
        .apply_edits(
            quiz_id,
            vec![Edit::Update {
                old: Frame::Options(old),
                new: Frame::Options(new),
            }],
        )
        .await
        .unwrap();

    let updated = library.get_quiz(quiz_id).await.unwrap().unwrap();
    let Frame::Options(options) = &updated.frames[0] else {
        panic!("expected options frame");
    };
    assert_eq!(options.frames.len(), 2);
    assert_eq!(options.frames[0], a);
    assert_eq!(text_content(&options.frames[1].frame), "D");
    assert!(updated.modification_time.is_some());

    assert_eq!(text_row_count(&library).await, 2);
    for id in removed_ids {
        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM text_frame WHERE id = ?")
            .bind(id)
            .fetch_one(library.pool())
            .await
            .unwrap();
        assert_eq!(left, 0, "text frame #{} should be gone", id);
    }

    library.shutdown().await;
}

#[tokio::test]
async fn test_removing_options_frame_removes_children() {
    let (_temp_dir, _paths, library) = open_library().await.unwrap();
    let quiz_id = library
        .import_single(pack_bytes(
            vec![quiz(
                "Short",
                vec![
                    text("stem"),
                    options("pair", vec![option_text("yes", true, 0), option_text("no", false, 1)]),
                ],
            )],
            &[],
        ))
        .await
        .unwrap();
    let stored = library.get_quiz(quiz_id).await.unwrap().unwrap();

    library
        .apply_edits(
            quiz_id,
            vec![Edit::Remove {
                frame: stored.frames[1].clone(),
                old_index: 1,
            }],
        )
        .await
        .unwrap();

    let updated = library.get_quiz(quiz_id).await.unwrap().unwrap();
    assert_eq!(updated.frames.len(), 1);
    assert_eq!(text_row_count(&library).await, 1);
    let options_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM options_frame")
        .fetch_one(library.pool())
        .await
        .unwrap();
    assert_eq!(options_rows, 0);

    library.shutdown().await;
}

/// A raw history touching the first and second frames of a three-frame quiz
fn history(quiz: &Quiz) -> Vec<Edit> {
    let first = quiz.frames[0].clone();
    let Frame::Text(mut draft) = first.clone() else {
        panic!("expected text frame");
    };
    draft.content = "draft".to_string();
    let mut final_text = draft.clone();
    final_text.content = "final".to_string();

    vec![
        Edit::Update {
            old: first,
            new: Frame::Text(draft.clone()),
        },
        Edit::Rename {
            old: Some("Start".to_string()),
            new: Some("Middle".to_string()),
        },
        Edit::Update {
            old: Frame::Text(draft),
            new: Frame::Text(final_text),
        },
        Edit::Remove {
            frame: quiz.frames[1].clone(),
            old_index: 1,
        },
        Edit::Append {
            frame: Frame::Text(TextFrame {
                id: -1,
                content: "inserted".to_string(),
            }),
            insert_index: 1,
        },
        Edit::Rename {
            old: Some("Middle".to_string()),
            new: Some("End".to_string()),
        },
    ]
}

#[tokio::test]
async fn test_optimized_history_matches_raw_history() {
    let (_temp_dir, _paths, library) = open_library().await.unwrap();
    let bytes = || {
        pack_bytes(
            vec![quiz("Start", vec![text("a"), text("gone"), text("tail")])],
            &[],
        )
    };
    let raw_id = library.import_single(bytes()).await.unwrap();
    let optimized_id = library.import_single(bytes()).await.unwrap();

    let raw_quiz = library.get_quiz(raw_id).await.unwrap().unwrap();
    let raw = history(&raw_quiz);
    apply(library.pool(), raw_id, &raw, &FixedClock(Utc::now()))
        .await
        .unwrap();

    let optimized_quiz = library.get_quiz(optimized_id).await.unwrap().unwrap();
    let optimized_history = history(&optimized_quiz);
    assert!(optimize(&optimized_history).len() < optimized_history.len());
    library
        .apply_edits(optimized_id, optimized_history)
        .await
        .unwrap();

    let raw_result = library.get_quiz(raw_id).await.unwrap().unwrap().to_archive();
    let optimized_result = library
        .get_quiz(optimized_id)
        .await
        .unwrap()
        .unwrap()
        .to_archive();

    assert_eq!(raw_result.name.as_deref(), Some("End"));
    assert_eq!(optimized_result.name, raw_result.name);
    assert_eq!(optimized_result.frames, raw_result.frames);
    assert_eq!(
        optimized_result.frames,
        vec![text("final"), text("inserted"), text("tail")]
    );

    library.shutdown().await;
}

fn new_text(id: i64, content: &str) -> Frame {
    Frame::Text(TextFrame {
        id,
        content: content.to_string(),
    })
}

#[tokio::test]
async fn test_optimized_appends_land_where_raw_appends_do() {
    let (_temp_dir, _paths, library) = open_library().await.unwrap();
    let bytes = || pack_bytes(vec![quiz("Letters", vec![text("A"), text("B"), text("C")])], &[]);
    let raw_id = library.import_single(bytes()).await.unwrap();
    let optimized_id = library.import_single(bytes()).await.unwrap();

    let history = |quiz: &Quiz| {
        vec![
            Edit::Append {
                frame: new_text(-1, "X"),
                insert_index: 3,
            },
            Edit::Remove {
                frame: quiz.frames[0].clone(),
                old_index: 0,
            },
            Edit::Append {
                frame: new_text(-2, "Y"),
                insert_index: 3,
            },
        ]
    };

    let raw_quiz = library.get_quiz(raw_id).await.unwrap().unwrap();
    apply(library.pool(), raw_id, &history(&raw_quiz), &FixedClock(Utc::now()))
        .await
        .unwrap();
    let optimized_quiz = library.get_quiz(optimized_id).await.unwrap().unwrap();
    library
        .apply_edits(optimized_id, history(&optimized_quiz))
        .await
        .unwrap();

    let expected = vec![text("B"), text("C"), text("X"), text("Y")];
    for quiz_id in [raw_id, optimized_id] {
        let stored = library.get_quiz(quiz_id).await.unwrap().unwrap().to_archive();
        assert_eq!(stored.frames, expected, "quiz #{}", quiz_id);
    }

    // A second edit session sees dense positions
    let stored = library.get_quiz(optimized_id).await.unwrap().unwrap();
    library
        .apply_edits(
            optimized_id,
            vec![Edit::Append {
                frame: new_text(-3, "Z"),
                insert_index: 3,
            }],
        )
        .await
        .unwrap();
    let frames = library
        .get_quiz(optimized_id)
        .await
        .unwrap()
        .unwrap()
        .to_archive()
        .frames;
    assert_eq!(stored.frames.len(), 4);
    assert_eq!(
        frames,
        vec![text("B"), text("C"), text("X"), text("Z"), text("Y")]
    );

    library.shutdown().await;
}

#[tokio::test]
async fn test_edits_on_missing_quiz_fail() {
    let (_temp_dir, _paths, library) = open_library().await.unwrap();

    let result = library
        .apply_edits(
            4242,
            vec![Edit::Rename {
                old: None,
                new: Some("Ghost".to_string()),
            }],
        )
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    library.shutdown().await;
}
