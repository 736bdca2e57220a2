//! Interactive line shell driving one dashboard session.

use std::collections::BTreeSet;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use zuriflat_core::{FilterPatch, ListingId, ProjectionMode};
use zuriflat_host::{Dashboard, Panel, ViewEvent};
use zuriflat_state::{DraftField, ViewKind};
use zuriflat_sync::ListingApi;

use crate::display;

const HELP: &str = "\
commands:
  recs | map | scatter | radar | explain | detail | sample
  select <id>            toggle a listing in the selection
  clear                  clear the selection
  brush <view> <id>...   replace the brushed set (view: map, scatter, list)
  unbrush                clear brushing
  open <id> | close      focus or unfocus the detail view
  rate <id> <1-5>        rate a listing
  type <field> <text>    debounced numeric filter input (price_min, price_max, distance_max)
  rooms <type>...        restrict room types (none to clear)
  reviews <n>            minimum review count
  reset                  reset all filters
  mode raw|pca           projection mode
  attrs <a> <b>          projection attributes
  outliers on|off        projection outlier filter
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show(View),
    Event(ViewEvent),
    Rate(ListingId, u8),
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Recommendations,
    Map,
    Scatter,
    Radar,
    Explain,
    Detail,
    Sample,
}

fn view_kind(name: &str) -> Option<ViewKind> {
    match name {
        "map" => Some(ViewKind::Map),
        "scatter" => Some(ViewKind::Scatter),
        "list" => Some(ViewKind::RankedList),
        _ => None,
    }
}

fn ids(words: &[&str]) -> Vec<ListingId> {
    words.iter().map(|w| ListingId::from(*w)).collect()
}

/// Parse one input line. Blank lines parse to `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = words.split_first() else {
        return Ok(None);
    };
    let command = match (head, args) {
        ("recs", []) => Command::Show(View::Recommendations),
        ("map", []) => Command::Show(View::Map),
        ("scatter", []) => Command::Show(View::Scatter),
        ("radar", []) => Command::Show(View::Radar),
        ("explain", []) => Command::Show(View::Explain),
        ("detail", []) => Command::Show(View::Detail),
        ("sample", []) => Command::Show(View::Sample),
        ("select", [id]) => Command::Event(ViewEvent::ToggleSelect(ListingId::from(*id))),
        ("clear", []) => Command::Event(ViewEvent::ClearSelection),
        ("brush", [view, rest @ ..]) => {
            let source = view_kind(view).ok_or_else(|| format!("unknown view: {view}"))?;
            Command::Event(ViewEvent::Brush {
                source,
                ids: ids(rest),
            })
        }
        ("unbrush", []) => Command::Event(ViewEvent::ClearBrush),
        ("open", [id]) => Command::Event(ViewEvent::OpenDetail(ListingId::from(*id))),
        ("close", []) => Command::Event(ViewEvent::CloseDetail),
        ("rate", [id, value]) => {
            let value = value
                .parse::<u8>()
                .map_err(|_| format!("rating must be a number: {value}"))?;
            Command::Rate(ListingId::from(*id), value)
        }
        ("type", [field, rest @ ..]) => {
            let field = DraftField::parse(field).ok_or_else(|| format!("unknown field: {field}"))?;
            Command::Event(ViewEvent::FilterInput {
                field,
                raw: rest.join(" "),
            })
        }
        ("rooms", types) => Command::Event(ViewEvent::UpdateFilter(FilterPatch {
            room_types: Some(types.iter().map(|t| t.replace('_', " ")).collect::<BTreeSet<_>>()),
            ..Default::default()
        })),
        ("reviews", [n]) => {
            let n = n
                .parse::<u32>()
                .map_err(|_| format!("not a count: {n}"))?;
            Command::Event(ViewEvent::UpdateFilter(FilterPatch {
                min_reviews: Some(Some(n)),
                ..Default::default()
            }))
        }
        ("reset", []) => Command::Event(ViewEvent::ResetFilters),
        ("mode", ["raw"]) => Command::Event(ViewEvent::SetProjectionMode(ProjectionMode::Raw)),
        ("mode", ["pca"]) => Command::Event(ViewEvent::SetProjectionMode(ProjectionMode::Pca)),
        ("attrs", attrs) => Command::Event(ViewEvent::SetProjectionAttributes(
            attrs.iter().map(|a| a.to_string()).collect(),
        )),
        ("outliers", ["on"]) => Command::Event(ViewEvent::SetFilterOutliers(true)),
        ("outliers", ["off"]) => Command::Event(ViewEvent::SetFilterOutliers(false)),
        ("help", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        _ => return Err(format!("unrecognised command: {line} (try `help`)")),
    };
    Ok(Some(command))
}

fn show<T>(panel: Panel<T>, render: impl Fn(&T) -> String, disabled: &str) -> String {
    match panel {
        Panel::Ready(v) => render(&v),
        Panel::Disabled => format!("({disabled})\n"),
        Panel::Failed(err) => format!("error: {err}\n"),
    }
}

async fn render<A: ListingApi + 'static>(dashboard: &mut Dashboard<A>, view: View) -> String {
    match view {
        View::Recommendations => show(
            dashboard.ranked_list().await,
            display::render_ranked,
            "no recommendations",
        ),
        View::Map => show(dashboard.map().await, display::render_map, "no listings"),
        View::Scatter => show(
            dashboard.scatter().await,
            display::render_scatter,
            "choose projection attributes with `attrs`",
        ),
        View::Radar => show(
            dashboard.radar(),
            display::render_radar,
            "nothing to compare: select listings or load recommendations",
        ),
        View::Explain => show(
            dashboard.contributions().await,
            display::render_contributions,
            "nothing to explain",
        ),
        View::Detail => show(
            dashboard.detail().await,
            display::render_detail,
            "no listing focused: use `open <id>`",
        ),
        View::Sample => show(
            dashboard.calibration().await,
            display::render_calibration,
            "no sample",
        ),
    }
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run<A: ListingApi + 'static>(dashboard: &mut Dashboard<A>) -> anyhow::Result<()> {
    println!("session {}; type `help` for commands", dashboard.session());
    run_lines(dashboard, BufReader::new(tokio::io::stdin())).await
}

enum Next {
    Line(Option<String>),
    Settled(bool),
}

/// Drive the dashboard from `input`.
///
/// Typed filter text is only dispatched. Pending drafts commit when input
/// stays idle past the debounce delay, and are flushed before any other
/// command and at end of input.
pub async fn run_lines<A, R>(dashboard: &mut Dashboard<A>, input: R) -> anyhow::Result<()>
where
    A: ListingApi + 'static,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let next = if dashboard.state().pending_filter_deadline().is_some() {
            tokio::select! {
                line = lines.next_line() => Next::Line(line?),
                committed = dashboard.settle_filters() => Next::Settled(committed),
            }
        } else {
            Next::Line(lines.next_line().await?)
        };
        let line = match next {
            Next::Settled(committed) => {
                if committed {
                    print!("{}", render(dashboard, View::Map).await);
                }
                continue;
            }
            Next::Line(None) => break,
            Next::Line(Some(line)) => line,
        };
        let command = match parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };
        if let Command::Event(event @ ViewEvent::FilterInput { .. }) = command {
            dashboard.dispatch(event);
            continue;
        }
        dashboard.settle_filters().await;
        match command {
            Command::Show(view) => print!("{}", render(dashboard, view).await),
            Command::Event(event) => {
                if !dashboard.dispatch(event) {
                    println!("(no change)");
                }
            }
            Command::Rate(id, value) => match dashboard.rate(&id, value).await {
                Ok(ack) => println!("{}", display::render_ack(&ack)),
                Err(err) => eprintln!("{err}"),
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(()),
        }
    }
    dashboard.settle_filters().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use zuriflat_core::{DashboardConfig, Endpoint};
    use zuriflat_state::Slice;
    use zuriflat_sync::MemoryApi;
    use zuriflat_sync::memory::sample_listings;

    fn dashboard() -> (Arc<MemoryApi>, Dashboard<MemoryApi>, Arc<AtomicUsize>) {
        let api = Arc::new(MemoryApi::new(sample_listings()));
        let mut d = Dashboard::with_session(DashboardConfig::default(), Arc::clone(&api), "s1".into());
        let commits = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&commits);
        d.subscribe(&[Slice::Filter], move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (api, d, commits)
    }

    #[tokio::test(start_paused = true)]
    async fn pasted_filter_lines_commit_once_before_next_command() {
        let (api, mut d, commits) = dashboard();
        let input: &[u8] = b"type price_min 50\ntype price_max 150\ntype price_max 130\nmap\n";
        run_lines(&mut d, input).await.unwrap();

        assert_eq!(commits.load(Ordering::SeqCst), 1);
        let predicate = d.state().filter().predicate();
        assert_eq!(predicate.price_min, Some(50.0));
        assert_eq!(predicate.price_max, Some(130.0));
        assert_eq!(api.calls(Endpoint::Listings), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_filter_text_commits_at_end_of_input() {
        let (api, mut d, commits) = dashboard();
        let input: &[u8] = b"type price_min 5\ntype price_min 60\n";
        run_lines(&mut d, input).await.unwrap();

        assert_eq!(commits.load(Ordering::SeqCst), 1);
        assert_eq!(d.state().filter().predicate().price_min, Some(60.0));
        assert_eq!(api.calls(Endpoint::Listings), 0);
    }

    fn event(line: &str) -> ViewEvent {
        match parse(line) {
            Ok(Some(Command::Event(e))) => e,
            other => panic!("expected an event for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn parses_views_and_rating() {
        assert_eq!(parse("map"), Ok(Some(Command::Show(View::Map))));
        assert_eq!(
            parse("rate 42 5"),
            Ok(Some(Command::Rate(ListingId::from("42"), 5)))
        );
        assert!(parse("rate 42 five").is_err());
        assert_eq!(parse("quit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn brush_takes_source_and_ids() {
        assert_eq!(
            event("brush scatter 1 2"),
            ViewEvent::Brush {
                source: ViewKind::Scatter,
                ids: vec![ListingId::from("1"), ListingId::from("2")],
            }
        );
        assert_eq!(
            event("brush map"),
            ViewEvent::Brush {
                source: ViewKind::Map,
                ids: vec![],
            }
        );
        assert!(parse("brush radar 1").is_err());
    }

    #[test]
    fn typed_filter_input_keeps_raw_text() {
        assert_eq!(
            event("type price_min 1 5"),
            ViewEvent::FilterInput {
                field: DraftField::PriceMin,
                raw: "1 5".into(),
            }
        );
        assert_eq!(
            event("type price_max"),
            ViewEvent::FilterInput {
                field: DraftField::PriceMax,
                raw: String::new(),
            }
        );
        assert!(parse("type colour red").is_err());
    }

    #[test]
    fn room_types_accept_underscored_names() {
        let ViewEvent::UpdateFilter(patch) = event("rooms Private_room") else {
            panic!("expected a filter update");
        };
        assert_eq!(
            patch.room_types,
            Some(BTreeSet::from(["Private room".to_string()]))
        );
        let ViewEvent::UpdateFilter(clear) = event("rooms") else {
            panic!("expected a filter update");
        };
        assert_eq!(clear.room_types, Some(BTreeSet::new()));
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert!(parse("dance").is_err());
        assert!(parse("mode 3d").is_err());
    }
}
