//! Field reconciliation
//!
//! Walks every configured repository, links each open pull request and issue
//! to the board and writes the field values its rules ask for. Processing is
//! strictly sequential and the first error ends the run.

use tracing::{debug, info};

use crate::config::{FieldRule, RepositoryConfig, RuleType};
use crate::gateway::BoardGateway;
use crate::model::{Board, BoardField, BoardItem, FieldUpdate, ItemKind, TrackedItem};
use crate::{Error, Result};

/// Receives progress notifications during a sync run
pub trait SyncReporter {
    /// A repository's items were listed and are about to be processed
    fn repository_started(&mut self, index: usize, total: usize, repository: &str, items: usize);

    /// All fields of an item were written
    fn item_synced(&mut self, item: &TrackedItem);
}

/// Reporter that ignores all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl SyncReporter for NoopReporter {
    fn repository_started(&mut self, _: usize, _: usize, _: &str, _: usize) {}

    fn item_synced(&mut self, _: &TrackedItem) {}
}

/// Counters for a completed run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub repositories: usize,
    pub items: usize,
    pub fields_written: usize,
    pub fields_skipped: usize,
}

/// Compute the write a rule requires for one item
///
/// Returns `Ok(None)` when the rule does not apply to the item or the field
/// is already set and must not be overwritten.
pub fn resolve_field_value(
    field: &BoardField,
    rule: &FieldRule,
    item: &TrackedItem,
    current: &BoardItem,
) -> Result<Option<FieldUpdate>> {
    let update = match rule.kind()? {
        RuleType::Draft => match item.is_draft() {
            Some(draft) => Some(select_option(field, &draft.to_string())?),
            None => None,
        },
        RuleType::Changes => item.changes().map(|c| FieldUpdate::Number(c as f64)),
        RuleType::Author => Some(FieldUpdate::Text(item.author.clone())),
        RuleType::LastActivity => Some(FieldUpdate::Date(item.last_activity.date_naive())),
        RuleType::DefaultSingleSelect => {
            if current.value_for(field).is_some_and(|v| v.data.is_set()) {
                None
            } else {
                Some(select_option(field, &rule.value)?)
            }
        }
        RuleType::SingleSelect => Some(select_option(field, &rule.value)?),
        RuleType::Type => Some(select_option(field, item.type_option_name())?),
    };

    Ok(update)
}

fn select_option(field: &BoardField, option: &str) -> Result<FieldUpdate> {
    field
        .find_option_by_name(option)
        .map(|o| FieldUpdate::SingleSelectOption(o.id.clone()))
        .ok_or_else(|| Error::UnknownOption {
            field: field.name.clone(),
            option: option.to_string(),
        })
}

/// Drives a sync run against one board
pub struct Synchronizer<'a, G: BoardGateway + ?Sized> {
    gateway: &'a G,
    board: &'a Board,
}

impl<'a, G: BoardGateway + ?Sized> Synchronizer<'a, G> {
    pub fn new(gateway: &'a G, board: &'a Board) -> Self {
        Self { gateway, board }
    }

    /// Sync every repository in configuration order
    pub async fn sync_repositories(
        &self,
        repositories: &[RepositoryConfig],
        reporter: &mut dyn SyncReporter,
    ) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();

        for (index, repository) in repositories.iter().enumerate() {
            self.sync_repository(index, repositories.len(), repository, reporter, &mut summary)
                .await?;
        }

        info!(
            repositories = summary.repositories,
            items = summary.items,
            fields_written = summary.fields_written,
            fields_skipped = summary.fields_skipped,
            "Sync complete"
        );

        Ok(summary)
    }

    async fn sync_repository(
        &self,
        index: usize,
        total: usize,
        repository: &RepositoryConfig,
        reporter: &mut dyn SyncReporter,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let repo = repository.repo_ref()?;
        let wrap = |source: Error| Error::Repository {
            repository: repository.name.clone(),
            source: Box::new(source),
        };

        let mut items = self
            .gateway
            .list_open_items(&repo, ItemKind::PullRequest)
            .await
            .map_err(wrap)?;
        items.extend(
            self.gateway
                .list_open_items(&repo, ItemKind::Issue)
                .await
                .map_err(wrap)?,
        );

        info!(repository = %repo, items = items.len(), "Syncing repository");
        reporter.repository_started(index, total, &repository.name, items.len());

        for item in &items {
            self.sync_item(&repository.fields, item, summary)
                .await
                .map_err(|source| Error::Item {
                    kind: item.kind(),
                    url: item.url.clone(),
                    source: Box::new(source),
                })?;
            summary.items += 1;
            reporter.item_synced(item);
        }

        summary.repositories += 1;
        Ok(())
    }

    async fn sync_item(
        &self,
        rules: &[FieldRule],
        item: &TrackedItem,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let board_item = self
            .gateway
            .add_item(&self.board.id, &item.id)
            .await
            .map_err(|source| Error::AddItem {
                source: Box::new(source),
            })?;

        for rule in rules {
            let field = self
                .board
                .find_field_by_name(&rule.name)
                .ok_or_else(|| Error::UnknownField {
                    field: rule.name.clone(),
                })?;

            match resolve_field_value(field, rule, item, &board_item)? {
                Some(value) => {
                    debug!(item = %item.url, field = %field.name, ?value, "Updating field");
                    self.gateway
                        .update_item_field(&self.board.id, &board_item.id, &field.id, &value)
                        .await
                        .map_err(|source| Error::UpdateField {
                            field: field.name.clone(),
                            source: Box::new(source),
                        })?;
                    summary.fields_written += 1;
                }
                None => {
                    debug!(item = %item.url, field = %field.name, rule = %rule.rule_type, "Skipping field");
                    summary.fields_skipped += 1;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProjectRef, RepoRef};
    use crate::model::{
        ChangedFile, FieldKind, FieldOption, FieldValue, FieldValueData, ItemDetails,
        PullRequestDetails,
    };
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        List(String, ItemKind),
        Add(String),
        Update {
            item: String,
            field: String,
            value: FieldUpdate,
        },
    }

    #[derive(Default)]
    struct FakeGateway {
        items: HashMap<(String, ItemKind), Vec<TrackedItem>>,
        snapshots: HashMap<String, Vec<FieldValue>>,
        fail_update_on: Option<String>,
        fail_add_on: Option<String>,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeGateway {
        fn with_items(mut self, repo: &str, kind: ItemKind, items: Vec<TrackedItem>) -> Self {
            self.items.insert((repo.to_string(), kind), items);
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn updates(&self) -> Vec<(String, FieldUpdate)> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Update { field, value, .. } => Some((field, value)),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl BoardGateway for FakeGateway {
        async fn fetch_board(&self, _project: &ProjectRef) -> Result<Board> {
            Ok(board())
        }

        async fn list_open_items(
            &self,
            repo: &RepoRef,
            kind: ItemKind,
        ) -> Result<Vec<TrackedItem>> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::List(repo.to_string(), kind));
            Ok(self
                .items
                .get(&(repo.to_string(), kind))
                .cloned()
                .unwrap_or_default())
        }

        async fn add_item(&self, _board_id: &str, content_id: &str) -> Result<BoardItem> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Add(content_id.to_string()));
            if self.fail_add_on.as_deref() == Some(content_id) {
                return Err(Error::TooManyFields {
                    item: format!("ITEM_{}", content_id),
                    limit: 100,
                });
            }
            Ok(BoardItem {
                id: format!("ITEM_{}", content_id),
                field_values: self.snapshots.get(content_id).cloned().unwrap_or_default(),
            })
        }

        async fn update_item_field(
            &self,
            _board_id: &str,
            item_id: &str,
            field_id: &str,
            value: &FieldUpdate,
        ) -> Result<()> {
            if self.fail_update_on.as_deref() == Some(item_id) {
                return Err(Error::Upstream("mutation failed".to_string()));
            }
            self.calls.lock().unwrap().push(Call::Update {
                item: item_id.to_string(),
                field: field_id.to_string(),
                value: value.clone(),
            });
            Ok(())
        }
    }

    fn option(id: &str, name: &str) -> FieldOption {
        FieldOption {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn board() -> Board {
        Board {
            id: "PVT_1".to_string(),
            title: "Board".to_string(),
            fields: vec![
                BoardField {
                    id: "F_STATUS".to_string(),
                    name: "Status".to_string(),
                    kind: FieldKind::SingleSelect {
                        options: vec![option("opt_true", "true"), option("opt_false", "false")],
                    },
                },
                BoardField {
                    id: "F_OWNER".to_string(),
                    name: "Owner".to_string(),
                    kind: FieldKind::Text,
                },
                BoardField {
                    id: "F_STAGE".to_string(),
                    name: "Stage".to_string(),
                    kind: FieldKind::SingleSelect {
                        options: vec![
                            option("opt_todo", "Todo"),
                            option("opt_done", "Done"),
                            option("opt_done_2", "Done"),
                        ],
                    },
                },
                BoardField {
                    id: "F_KIND".to_string(),
                    name: "Kind".to_string(),
                    kind: FieldKind::SingleSelect {
                        options: vec![option("opt_pr", "Pull Request"), option("opt_issue", "Issue")],
                    },
                },
                BoardField {
                    id: "F_SIZE".to_string(),
                    name: "Size".to_string(),
                    kind: FieldKind::Number,
                },
                BoardField {
                    id: "F_ACTIVE".to_string(),
                    name: "Active".to_string(),
                    kind: FieldKind::Date,
                },
            ],
        }
    }

    fn pull_request(id: &str, draft: bool, files: Vec<ChangedFile>) -> TrackedItem {
        TrackedItem {
            id: id.to_string(),
            url: format!("https://github.com/org/repo/pull/{}", id),
            author: "alice".to_string(),
            last_activity: Utc.with_ymd_and_hms(2024, 3, 9, 17, 30, 0).unwrap(),
            details: ItemDetails::PullRequest(PullRequestDetails {
                is_draft: draft,
                files,
            }),
        }
    }

    fn issue(id: &str) -> TrackedItem {
        TrackedItem {
            id: id.to_string(),
            url: format!("https://github.com/org/repo/issues/{}", id),
            author: "bob".to_string(),
            last_activity: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            details: ItemDetails::Issue,
        }
    }

    fn repo(rules: Vec<FieldRule>) -> Vec<RepositoryConfig> {
        vec![RepositoryConfig {
            name: "org/repo".to_string(),
            fields: rules,
        }]
    }

    fn field<'a>(board: &'a Board, name: &str) -> &'a BoardField {
        board.find_field_by_name(name).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_draft_and_author() {
        let gateway = FakeGateway::default().with_items(
            "org/repo",
            ItemKind::PullRequest,
            vec![pull_request("PR_1", true, vec![ChangedFile::new("main.go", 5, 3)])],
        );
        let board = board();
        let rules = vec![
            FieldRule::new("Status", "draft", ""),
            FieldRule::new("Owner", "author", ""),
        ];

        let summary = Synchronizer::new(&gateway, &board)
            .sync_repositories(&repo(rules), &mut NoopReporter)
            .await
            .unwrap();

        assert_eq!(
            gateway.calls(),
            vec![
                Call::List("org/repo".to_string(), ItemKind::PullRequest),
                Call::List("org/repo".to_string(), ItemKind::Issue),
                Call::Add("PR_1".to_string()),
                Call::Update {
                    item: "ITEM_PR_1".to_string(),
                    field: "F_STATUS".to_string(),
                    value: FieldUpdate::SingleSelectOption("opt_true".to_string()),
                },
                Call::Update {
                    item: "ITEM_PR_1".to_string(),
                    field: "F_OWNER".to_string(),
                    value: FieldUpdate::Text("alice".to_string()),
                },
            ]
        );
        assert_eq!(
            summary,
            SyncSummary {
                repositories: 1,
                items: 1,
                fields_written: 2,
                fields_skipped: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_pull_requests_before_issues() {
        let gateway = FakeGateway::default()
            .with_items("org/repo", ItemKind::Issue, vec![issue("I_1"), issue("I_2")])
            .with_items(
                "org/repo",
                ItemKind::PullRequest,
                vec![pull_request("PR_1", false, vec![])],
            );
        let board = board();

        Synchronizer::new(&gateway, &board)
            .sync_repositories(&repo(vec![]), &mut NoopReporter)
            .await
            .unwrap();

        let added: Vec<String> = gateway
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Add(id) => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(added, vec!["PR_1", "I_1", "I_2"]);
    }

    #[tokio::test]
    async fn test_draft_and_changes_skipped_for_issues() {
        let gateway =
            FakeGateway::default().with_items("org/repo", ItemKind::Issue, vec![issue("I_1")]);
        let board = board();
        let rules = vec![
            FieldRule::new("Status", "draft", ""),
            FieldRule::new("Size", "changes", ""),
            FieldRule::new("Kind", "type", ""),
        ];

        let summary = Synchronizer::new(&gateway, &board)
            .sync_repositories(&repo(rules), &mut NoopReporter)
            .await
            .unwrap();

        assert_eq!(
            gateway.updates(),
            vec![(
                "F_KIND".to_string(),
                FieldUpdate::SingleSelectOption("opt_issue".to_string())
            )]
        );
        assert_eq!(summary.fields_skipped, 2);
    }

    #[tokio::test]
    async fn test_changes_and_last_activity_for_pull_request() {
        let gateway = FakeGateway::default().with_items(
            "org/repo",
            ItemKind::PullRequest,
            vec![pull_request(
                "PR_1",
                false,
                vec![
                    ChangedFile::new("src/a.go", 10, 2),
                    ChangedFile::new("vendor/lib.go", 100, 0),
                ],
            )],
        );
        let board = board();
        let rules = vec![
            FieldRule::new("Size", "changes", ""),
            FieldRule::new("Active", "last_activity", ""),
            FieldRule::new("Kind", "type", ""),
        ];

        Synchronizer::new(&gateway, &board)
            .sync_repositories(&repo(rules), &mut NoopReporter)
            .await
            .unwrap();

        assert_eq!(
            gateway.updates(),
            vec![
                ("F_SIZE".to_string(), FieldUpdate::Number(12.0)),
                (
                    "F_ACTIVE".to_string(),
                    FieldUpdate::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
                ),
                (
                    "F_KIND".to_string(),
                    FieldUpdate::SingleSelectOption("opt_pr".to_string())
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_default_single_select_keeps_existing_value() {
        let mut gateway = FakeGateway::default().with_items(
            "org/repo",
            ItemKind::Issue,
            vec![issue("I_SET"), issue("I_EMPTY")],
        );
        gateway.snapshots.insert(
            "I_SET".to_string(),
            vec![FieldValue {
                field_id: "F_STAGE".to_string(),
                field_name: "Stage".to_string(),
                data: FieldValueData::SingleSelect {
                    option_id: "opt_done".to_string(),
                    name: "Done".to_string(),
                },
            }],
        );
        let board = board();
        let rules = vec![FieldRule::new("Stage", "default_single_select", "Todo")];

        Synchronizer::new(&gateway, &board)
            .sync_repositories(&repo(rules), &mut NoopReporter)
            .await
            .unwrap();

        let updates: Vec<Call> = gateway
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Update { .. }))
            .collect();
        assert_eq!(
            updates,
            vec![Call::Update {
                item: "ITEM_I_EMPTY".to_string(),
                field: "F_STAGE".to_string(),
                value: FieldUpdate::SingleSelectOption("opt_todo".to_string()),
            }]
        );
    }

    #[test]
    fn test_single_select_always_overwrites() {
        let board = board();
        let current = BoardItem {
            id: "ITEM".to_string(),
            field_values: vec![FieldValue {
                field_id: "F_STAGE".to_string(),
                field_name: "Stage".to_string(),
                data: FieldValueData::SingleSelect {
                    option_id: "opt_todo".to_string(),
                    name: "Todo".to_string(),
                },
            }],
        };

        let update = resolve_field_value(
            field(&board, "Stage"),
            &FieldRule::new("Stage", "single_select", "Done"),
            &issue("I_1"),
            &current,
        )
        .unwrap();

        // First "Done" wins over the duplicate.
        assert_eq!(
            update,
            Some(FieldUpdate::SingleSelectOption("opt_done".to_string()))
        );
    }

    #[test]
    fn test_default_single_select_treats_empty_value_as_unset() {
        let board = board();
        let current = BoardItem {
            id: "ITEM".to_string(),
            field_values: vec![FieldValue {
                field_id: "F_STAGE".to_string(),
                field_name: "Stage".to_string(),
                data: FieldValueData::SingleSelect {
                    option_id: String::new(),
                    name: String::new(),
                },
            }],
        };

        let update = resolve_field_value(
            field(&board, "Stage"),
            &FieldRule::new("Stage", "default_single_select", "Todo"),
            &issue("I_1"),
            &current,
        )
        .unwrap();
        assert_eq!(
            update,
            Some(FieldUpdate::SingleSelectOption("opt_todo".to_string()))
        );
    }

    #[test]
    fn test_unknown_option() {
        let board = board();
        let err = resolve_field_value(
            field(&board, "Stage"),
            &FieldRule::new("Stage", "single_select", "Blocked"),
            &issue("I_1"),
            &BoardItem::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownOption { field, option } if field == "Stage" && option == "Blocked"
        ));
    }

    #[test]
    fn test_draft_option_missing() {
        let board = board();
        let err = resolve_field_value(
            field(&board, "Owner"),
            &FieldRule::new("Owner", "draft", ""),
            &pull_request("PR_1", false, vec![]),
            &BoardItem::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownOption { option, .. } if option == "false"));
    }

    #[tokio::test]
    async fn test_unknown_field_aborts_run() {
        let gateway = FakeGateway::default().with_items(
            "org/repo",
            ItemKind::PullRequest,
            vec![pull_request("PR_1", false, vec![]), pull_request("PR_2", false, vec![])],
        );
        let board = board();
        let rules = vec![FieldRule::new("Priority", "author", "")];

        let err = Synchronizer::new(&gateway, &board)
            .sync_repositories(&repo(rules), &mut NoopReporter)
            .await
            .unwrap_err();

        assert!(matches!(err.root(), Error::UnknownField { field } if field == "Priority"));
        assert!(matches!(err, Error::Item { kind: ItemKind::PullRequest, .. }));
        // PR_2 is never reached.
        assert!(!gateway.calls().contains(&Call::Add("PR_2".to_string())));
    }

    #[tokio::test]
    async fn test_unknown_field_reported_even_for_issue_draft_rule() {
        let gateway =
            FakeGateway::default().with_items("org/repo", ItemKind::Issue, vec![issue("I_1")]);
        let board = board();
        let rules = vec![FieldRule::new("Missing", "draft", "")];

        let err = Synchronizer::new(&gateway, &board)
            .sync_repositories(&repo(rules), &mut NoopReporter)
            .await
            .unwrap_err();
        assert!(matches!(err.root(), Error::UnknownField { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_rule_stops_before_later_rules() {
        let gateway = FakeGateway::default().with_items(
            "org/repo",
            ItemKind::PullRequest,
            vec![pull_request("PR_1", false, vec![])],
        );
        let board = board();
        let rules = vec![
            FieldRule::new("Owner", "assignee", ""),
            FieldRule::new("Owner", "author", ""),
        ];

        let err = Synchronizer::new(&gateway, &board)
            .sync_repositories(&repo(rules), &mut NoopReporter)
            .await
            .unwrap_err();

        assert!(matches!(err.root(), Error::UnsupportedRule { rule } if rule == "assignee"));
        assert!(gateway.updates().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_stops_later_items() {
        let mut gateway = FakeGateway::default().with_items(
            "org/repo",
            ItemKind::Issue,
            vec![issue("I_1"), issue("I_2")],
        );
        gateway.fail_update_on = Some("ITEM_I_1".to_string());
        let board = board();
        let rules = vec![FieldRule::new("Owner", "author", "")];

        let err = Synchronizer::new(&gateway, &board)
            .sync_repositories(&repo(rules), &mut NoopReporter)
            .await
            .unwrap_err();

        assert!(matches!(err.root(), Error::Upstream(_)));
        assert!(!gateway.calls().contains(&Call::Add("I_2".to_string())));

        let message = err.to_string();
        assert!(message.contains("issues/I_1"));
        assert!(message.contains("failed to update project item field: Owner"));
    }

    #[tokio::test]
    async fn test_add_failure_names_operation() {
        let mut gateway = FakeGateway::default().with_items(
            "org/repo",
            ItemKind::PullRequest,
            vec![pull_request("PR_1", false, vec![])],
        );
        gateway.fail_add_on = Some("PR_1".to_string());
        let board = board();
        let rules = vec![FieldRule::new("Owner", "author", "")];

        let err = Synchronizer::new(&gateway, &board)
            .sync_repositories(&repo(rules), &mut NoopReporter)
            .await
            .unwrap_err();

        assert!(matches!(err.root(), Error::TooManyFields { .. }));
        assert!(err.to_string().contains("failed to add project item"));
        assert!(gateway.updates().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_repository_name() {
        let gateway = FakeGateway::default();
        let board = board();
        let repos = vec![RepositoryConfig {
            name: "not-a-repo".to_string(),
            fields: vec![],
        }];

        let err = Synchronizer::new(&gateway, &board)
            .sync_repositories(&repos, &mut NoopReporter)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("not-a-repo")));
        assert!(!err.to_string().contains("failed to list open items"));
        assert!(gateway.calls().is_empty());
    }

    #[derive(Default)]
    struct RecordingReporter {
        events: Vec<String>,
    }

    impl SyncReporter for RecordingReporter {
        fn repository_started(&mut self, index: usize, total: usize, repository: &str, items: usize) {
            self.events
                .push(format!("[{}/{}] {} {}", index, total, repository, items));
        }

        fn item_synced(&mut self, item: &TrackedItem) {
            self.events.push(item.id.clone());
        }
    }

    #[tokio::test]
    async fn test_reporter_receives_progress() {
        let gateway = FakeGateway::default()
            .with_items("org/repo", ItemKind::Issue, vec![issue("I_1")])
            .with_items(
                "org/repo",
                ItemKind::PullRequest,
                vec![pull_request("PR_1", false, vec![])],
            );
        let board = board();
        let mut reporter = RecordingReporter::default();

        Synchronizer::new(&gateway, &board)
            .sync_repositories(&repo(vec![]), &mut reporter)
            .await
            .unwrap();

        assert_eq!(reporter.events, vec!["[0/1] org/repo 2", "PR_1", "I_1"]);
    }
}
