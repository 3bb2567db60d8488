use draft_generator::{
    draft_generator_test::{MockGenerateResult, MockTextGenerator},
    GenerationError, ResponseFormat,
};
use patent_drafter::{
    ArtifactId, BriefField, Content, DraftError, Drafter, Drawing, Key, Session,
};
use std::sync::Arc;

const TITLES: &str = r#"{"titles": ["一种数据同步方法", "数据同步系统", "同步装置"]}"#;
const IDEAS: &str = r#"```json
{"drawings": [
  {"title": "系统结构图", "description": "模块关系"},
  {"title": "方法流程图", "description": "主要步骤"}
]}
```"#;

fn setup() -> (Arc<MockTextGenerator>, Session) {
    let mock = Arc::new(MockTextGenerator::new());
    let drafter = Drafter::builder(mock.clone())
        .build()
        .expect("default workflow is valid");
    (mock, drafter.create_session())
}

async fn commit_text(session: &Session, id: ArtifactId, text: &str) {
    session
        .commit_user_edit(id, Content::text(text))
        .await
        .expect("commit");
}

/// Title, background and the parts of the invention the drawings need.
async fn seed_invention(session: &Session) {
    commit_text(session, ArtifactId::Title, "一种数据同步方法").await;
    commit_text(session, ArtifactId::Background, "现有技术延迟高").await;
    commit_text(session, ArtifactId::InventionSolutionDetail, "采用增量日志").await;
    commit_text(session, ArtifactId::Invention, "### 发明目的\n\n降低延迟").await;
}

#[tokio::test]
async fn title_commits_candidates_and_first_candidate() {
    let (mock, session) = setup();
    session
        .update_brief(BriefField::CoreInventiveConcept, "增量日志同步")
        .await
        .expect("edit");

    mock.enqueue(TITLES);
    let index = session.generate(ArtifactId::Title).await.expect("generate");
    assert_eq!(index, 0);

    assert_eq!(
        session.get_active(ArtifactId::Title).await,
        Some(Content::text("一种数据同步方法"))
    );
    assert_eq!(
        session.get_active(ArtifactId::TitleCandidates).await,
        Some(Content::TextList(vec![
            "一种数据同步方法".to_string(),
            "数据同步系统".to_string(),
            "同步装置".to_string(),
        ]))
    );
    assert!(
        session.time_of(ArtifactId::Title).await
            > session.time_of(ArtifactId::TitleCandidates).await
    );

    let requests = mock.tracked_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].response_format, ResponseFormat::Json);
    assert!(requests[0].prompt.contains("增量日志同步"));
    assert_eq!(requests[0].temperature, Some(0.1));
    assert_eq!(requests[0].top_p, Some(0.1));
}

#[tokio::test]
async fn choosing_a_title_candidate_commits_it_as_the_title() {
    let (mock, session) = setup();
    mock.enqueue(TITLES);
    session.generate(ArtifactId::Title).await.expect("generate");

    let index = session.choose_title_candidate(2).await.expect("choose");
    assert_eq!(index, 1);
    assert_eq!(
        session.get_active(ArtifactId::Title).await,
        Some(Content::text("同步装置"))
    );
    assert_eq!(session.version_count(ArtifactId::TitleCandidates).await, 1);

    let err = session
        .choose_title_candidate(3)
        .await
        .expect_err("only three candidates");
    assert!(matches!(err, DraftError::InvalidInput(_)));
    assert_eq!(session.version_count(ArtifactId::Title).await, 2);
}

#[tokio::test]
async fn choosing_a_candidate_needs_candidates() {
    let (_, session) = setup();
    let err = session
        .choose_title_candidate(0)
        .await
        .expect_err("no candidates");
    assert!(matches!(
        err,
        DraftError::MissingDependency {
            dependency: ArtifactId::TitleCandidates,
            ..
        }
    ));
}

#[tokio::test]
async fn malformed_structured_output_commits_nothing() {
    let (mock, session) = setup();
    mock.enqueue("Here are some titles: A, B and C");

    let err = session
        .generate(ArtifactId::Title)
        .await
        .expect_err("not json");
    match err {
        DraftError::MalformedStructuredOutput { target, raw, .. } => {
            assert_eq!(target, "title_candidates");
            assert_eq!(raw, "Here are some titles: A, B and C");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.version_count(ArtifactId::Title).await, 0);
    assert_eq!(session.version_count(ArtifactId::TitleCandidates).await, 0);
}

#[tokio::test]
async fn title_candidates_come_from_the_titles_field() {
    let (mock, session) = setup();
    mock.enqueue(r#"{"analysis": ["note"], "titles": ["一种方法"]}"#);
    session.generate(ArtifactId::Title).await.expect("generate");
    let title = session.get_active(ArtifactId::Title).await.expect("title");
    assert_eq!(title.as_text(), Some("一种方法"));

    mock.enqueue(r#"{"analysis": ["note"]}"#);
    let err = session
        .generate(ArtifactId::Title)
        .await
        .expect_err("no titles field");
    assert!(matches!(
        err,
        DraftError::MalformedStructuredOutput {
            target: "title_candidates",
            ..
        }
    ));
    assert_eq!(session.version_count(ArtifactId::Title).await, 1);
}

#[tokio::test]
async fn generation_failure_is_reported_with_its_source() {
    let (mock, session) = setup();
    mock.enqueue(MockGenerateResult::error(GenerationError::Provider(
        "mock",
        "rate limited".to_string(),
    )));

    let err = session
        .generate(ArtifactId::SolutionPoints)
        .await
        .expect_err("provider error");
    assert!(matches!(
        err,
        DraftError::GenerationFailed {
            target: "solution_points",
            source: GenerationError::Provider(..),
        }
    ));
    assert_eq!(session.version_count(ArtifactId::SolutionPoints).await, 0);
}

#[tokio::test]
async fn empty_completion_is_a_generation_failure() {
    let (mock, session) = setup();
    commit_text(&session, ArtifactId::Title, "T").await;
    mock.enqueue("   \n");

    let err = session
        .generate(ArtifactId::Background)
        .await
        .expect_err("empty");
    assert!(matches!(
        err,
        DraftError::GenerationFailed {
            source: GenerationError::Invariant(..),
            ..
        }
    ));
    assert_eq!(session.version_count(ArtifactId::Background).await, 0);
}

#[tokio::test]
async fn invention_runs_sub_steps_in_order() {
    let (mock, session) = setup();
    commit_text(&session, ArtifactId::Title, "一种数据同步方法").await;
    commit_text(&session, ArtifactId::Background, "现有技术延迟高").await;

    mock.enqueue_results([
        MockGenerateResult::text("降低同步延迟"),
        MockGenerateResult::text(r#"{"points": ["增量日志", "批量确认"]}"#),
        MockGenerateResult::text("方案细节"),
        MockGenerateResult::text("延迟降低一半"),
    ]);
    let index = session
        .generate(ArtifactId::Invention)
        .await
        .expect("generate");
    assert_eq!(index, 0);

    let requests = mock.tracked_requests();
    assert_eq!(requests.len(), 4);
    assert!(requests[0].prompt.contains("现有技术延迟高"));
    assert_eq!(requests[1].response_format, ResponseFormat::Json);
    assert!(requests[2].prompt.contains("- 增量日志\n- 批量确认"));
    assert!(requests[3].prompt.contains("方案细节"));

    assert_eq!(
        session.get_active(ArtifactId::SolutionPoints).await,
        Some(Content::TextList(vec![
            "增量日志".to_string(),
            "批量确认".to_string()
        ]))
    );
    assert_eq!(
        session.get_active(ArtifactId::Invention).await,
        Some(Content::text(
            "### 发明目的\n\n降低同步延迟\n\n### 技术解决方案\n\n方案细节\n\n### 技术效果\n\n延迟降低一半"
        ))
    );
    for step in [
        ArtifactId::InventionPurpose,
        ArtifactId::SolutionPoints,
        ArtifactId::InventionSolutionDetail,
        ArtifactId::InventionEffects,
    ] {
        assert_eq!(session.version_count(step).await, 1);
        assert!(!session.is_stale(step).await);
    }
    assert!(!session.is_stale(ArtifactId::Invention).await);
}

#[tokio::test]
async fn failed_sub_step_commits_no_step() {
    let (mock, session) = setup();
    commit_text(&session, ArtifactId::Title, "T").await;
    commit_text(&session, ArtifactId::Background, "B").await;

    mock.enqueue_results([
        MockGenerateResult::text("purpose"),
        MockGenerateResult::text(r#"["p1"]"#),
        MockGenerateResult::error(GenerationError::Provider("mock", "boom".to_string())),
    ]);
    let err = session
        .generate(ArtifactId::Invention)
        .await
        .expect_err("detail fails");
    assert!(matches!(
        err,
        DraftError::GenerationFailed {
            target: "invention_solution_detail",
            ..
        }
    ));
    assert_eq!(session.version_count(ArtifactId::InventionPurpose).await, 0);
    assert_eq!(session.version_count(ArtifactId::SolutionPoints).await, 0);
    assert_eq!(session.version_count(ArtifactId::Invention).await, 0);
}

#[tokio::test]
async fn sub_steps_can_be_regenerated_on_their_own() {
    let (mock, session) = setup();
    commit_text(&session, ArtifactId::Title, "T").await;
    commit_text(&session, ArtifactId::Background, "B").await;
    mock.enqueue_results(
        ["purpose", r#"["p1"]"#, "detail", "effects"].map(MockGenerateResult::from),
    );
    session
        .generate(ArtifactId::Invention)
        .await
        .expect("generate");

    mock.enqueue("better purpose");
    session
        .generate(ArtifactId::InventionPurpose)
        .await
        .expect("generate");
    assert_eq!(session.version_count(ArtifactId::InventionPurpose).await, 2);
    assert!(session.is_stale(ArtifactId::Invention).await);
}

#[tokio::test]
async fn drawings_render_every_idea() {
    let (mock, session) = setup();
    seed_invention(&session).await;

    mock.enqueue_results([
        IDEAS,
        "```mermaid\ngraph TD\nA-->B\n```",
        "flowchart LR\nS1-->S2",
    ]
    .map(MockGenerateResult::from));
    session
        .generate(ArtifactId::Drawings)
        .await
        .expect("generate");

    assert_eq!(
        session.get_active(ArtifactId::Drawings).await,
        Some(Content::DrawingList(vec![
            Drawing {
                title: "系统结构图".to_string(),
                description: "模块关系".to_string(),
                code: "graph TD\nA-->B".to_string(),
            },
            Drawing {
                title: "方法流程图".to_string(),
                description: "主要步骤".to_string(),
                code: "flowchart LR\nS1-->S2".to_string(),
            },
        ]))
    );

    let requests = mock.tracked_requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].response_format, ResponseFormat::Json);
    assert!(requests[1].prompt.contains("系统结构图"));
    assert!(requests[2].prompt.contains("主要步骤"));
    assert_eq!(requests[2].response_format, ResponseFormat::Text);
}

#[tokio::test]
async fn drawing_failure_keeps_the_previous_list() {
    let (mock, session) = setup();
    seed_invention(&session).await;
    mock.enqueue_results(
        [IDEAS, "graph TD\nA-->B", "flowchart LR\nS1-->S2"].map(MockGenerateResult::from),
    );
    session
        .generate(ArtifactId::Drawings)
        .await
        .expect("generate");
    let previous = session.get_active(ArtifactId::Drawings).await;

    mock.enqueue_results([
        MockGenerateResult::text(IDEAS),
        MockGenerateResult::text("graph TD\nX-->Y"),
        MockGenerateResult::error(GenerationError::Provider("mock", "timeout".to_string())),
    ]);
    let err = session
        .generate(ArtifactId::Drawings)
        .await
        .expect_err("second idea fails");
    assert!(matches!(
        err,
        DraftError::GenerationFailed {
            target: "drawings",
            ..
        }
    ));
    assert_eq!(session.version_count(ArtifactId::Drawings).await, 1);
    assert_eq!(session.get_active(ArtifactId::Drawings).await, previous);
}

#[tokio::test]
async fn malformed_drawing_ideas_are_reported() {
    let (mock, session) = setup();
    seed_invention(&session).await;
    mock.enqueue(r#"{"drawings": []}"#);

    let err = session
        .generate(ArtifactId::Drawings)
        .await
        .expect_err("no ideas");
    assert!(matches!(
        err,
        DraftError::MalformedStructuredOutput {
            target: "drawings",
            ..
        }
    ));
    assert_eq!(mock.tracked_requests().len(), 1);
}

#[tokio::test]
async fn single_drawing_operations_commit_whole_lists() {
    let (mock, session) = setup();
    seed_invention(&session).await;
    mock.enqueue_results(
        [IDEAS, "graph TD\nA-->B", "flowchart LR\nS1-->S2"].map(MockGenerateResult::from),
    );
    session
        .generate(ArtifactId::Drawings)
        .await
        .expect("generate");

    mock.enqueue("```mermaid\nflowchart LR\nS1-->S3\n```");
    let index = session.regenerate_drawing(1).await.expect("regenerate");
    assert_eq!(index, 1);
    let requests = mock.tracked_requests();
    assert!(requests[3].prompt.contains("方法流程图"));

    let index = session
        .edit_drawing_code(0, "graph TD\nA-->C")
        .await
        .expect("edit");
    assert_eq!(index, 2);

    let drawings = session
        .get_active(ArtifactId::Drawings)
        .await
        .expect("active list");
    let drawings = drawings.as_drawings().expect("drawing list");
    assert_eq!(drawings[0].code, "graph TD\nA-->C");
    assert_eq!(drawings[1].code, "flowchart LR\nS1-->S3");
    assert_eq!(session.version_count(ArtifactId::Drawings).await, 3);

    // the first version is still intact
    let versions = session.versions(ArtifactId::Drawings).await;
    assert_eq!(
        versions[0].as_drawings().expect("list")[1].code,
        "flowchart LR\nS1-->S2"
    );

    let err = session
        .regenerate_drawing(2)
        .await
        .expect_err("only two drawings");
    assert!(matches!(
        err,
        DraftError::DrawingOutOfRange { index: 2, count: 2 }
    ));
    assert_eq!(session.version_count(ArtifactId::Drawings).await, 3);
}

#[tokio::test]
async fn analyze_replaces_the_brief() {
    let (mock, session) = setup();
    mock.enqueue(
        r#"Sure:
{
  "background_technology": "主从复制",
  "problem_statement": "同步延迟高",
  "core_inventive_concept": "增量日志",
  "technical_solution_summary": "按批确认",
  "key_components_or_steps": [{"step": "采集日志"}, "合并批次"],
  "achieved_effects": "延迟降低"
}"#,
    );

    session
        .analyze("一种基于增量日志的数据同步方法")
        .await
        .expect("analyze");
    let brief = session.brief().await;
    assert_eq!(brief.problem_statement, "同步延迟高");
    assert_eq!(
        brief.key_components_or_steps,
        vec!["采集日志".to_string(), "合并批次".to_string()]
    );
    assert!(session.time_of(Key::Brief).await.is_some());

    let requests = mock.tracked_requests();
    assert_eq!(requests[0].response_format, ResponseFormat::Json);
    assert!(requests[0].prompt.contains("一种基于增量日志的数据同步方法"));
}

#[tokio::test]
async fn malformed_analysis_leaves_the_brief_alone() {
    let (mock, session) = setup();
    session
        .update_brief(BriefField::ProblemStatement, "原问题")
        .await
        .expect("edit");
    let stamp = session.time_of(Key::Brief).await;

    mock.enqueue("I could not understand the disclosure.");
    let err = session.analyze("something").await.expect_err("not json");
    assert!(matches!(
        err,
        DraftError::MalformedStructuredOutput {
            target: "structured_brief",
            ..
        }
    ));
    assert_eq!(session.brief().await.problem_statement, "原问题");
    assert_eq!(session.time_of(Key::Brief).await, stamp);

    let err = session.analyze("  ").await.expect_err("empty input");
    assert!(matches!(err, DraftError::InvalidInput(_)));
    assert_eq!(mock.tracked_requests().len(), 1);
}

#[tokio::test]
async fn refine_keeps_artifacts_untouched() {
    let (mock, session) = setup();
    for (id, text) in [
        (ArtifactId::Title, "T"),
        (ArtifactId::Background, "B"),
        (ArtifactId::Invention, "I"),
        (ArtifactId::Implementation, "M"),
    ] {
        commit_text(&session, id, text).await;
    }
    let stamp = session.time_of(ArtifactId::Implementation).await;

    mock.enqueue(r#"{"title": "T*", "background": "B*", "invention": "I*", "implementation": "M*"}"#);
    let refined = session.refine_draft().await.expect("refine");
    assert_eq!(refined.section(ArtifactId::Background), Some("B*"));
    assert_eq!(session.refined_draft().await, Some(refined));

    assert_eq!(session.version_count(ArtifactId::Background).await, 1);
    assert_eq!(
        session.get_active(ArtifactId::Title).await,
        Some(Content::text("T"))
    );
    assert_eq!(session.time_of(ArtifactId::Implementation).await, stamp);
    assert!(mock.tracked_requests()[0].prompt.contains("# Title\nT"));
}

#[tokio::test]
async fn refine_needs_every_text_section() {
    let (mock, session) = setup();
    commit_text(&session, ArtifactId::Title, "T").await;
    commit_text(&session, ArtifactId::Background, "B").await;
    commit_text(&session, ArtifactId::Invention, "I").await;

    let err = session.refine_draft().await.expect_err("missing section");
    assert!(matches!(
        err,
        DraftError::MissingDependency {
            target: "refined_draft",
            dependency: ArtifactId::Implementation,
        }
    ));
    assert!(mock.tracked_requests().is_empty());
    assert_eq!(session.refined_draft().await, None);
}

#[tokio::test]
async fn generate_all_produces_every_section_in_order() {
    let (mock, session) = setup();
    session
        .update_brief(BriefField::ProblemStatement, "同步延迟高")
        .await
        .expect("edit");

    mock.enqueue_results([
        TITLES,
        "背景技术",
        "目的",
        r#"["要点"]"#,
        "方案",
        "效果",
        IDEAS,
        "graph TD\nA-->B",
        "graph TD\nC-->D",
        "实施方式",
    ]
    .map(MockGenerateResult::from));
    let generated = session.generate_all().await.expect("generate all");
    assert_eq!(generated, ArtifactId::SECTIONS.to_vec());
    assert_eq!(mock.pending_results(), 0);

    for id in ArtifactId::ALL {
        assert_eq!(session.version_count(id).await, 1, "{id}");
        assert!(!session.is_stale(id).await, "{id}");
    }
    assert_eq!(
        session.get_active(ArtifactId::Implementation).await,
        Some(Content::text("实施方式"))
    );
}

#[tokio::test]
async fn generate_all_stops_at_the_first_failure() {
    let (mock, session) = setup();
    mock.enqueue_results([
        MockGenerateResult::text(TITLES),
        MockGenerateResult::error(GenerationError::Provider("mock", "down".to_string())),
    ]);

    let err = session.generate_all().await.expect_err("background fails");
    assert!(matches!(
        err,
        DraftError::GenerationFailed {
            target: "background",
            ..
        }
    ));
    assert_eq!(session.version_count(ArtifactId::Title).await, 1);
    assert_eq!(session.version_count(ArtifactId::Background).await, 0);
    assert_eq!(session.version_count(ArtifactId::Invention).await, 0);
    assert_eq!(mock.tracked_requests().len(), 2);
}
