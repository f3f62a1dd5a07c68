use crate::ast::Node;
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::fetch::Fetcher;
use crate::limiter::RateLimiter;
use crate::page::{extract_course_codes, parse_course_page, CoursePage};
use crate::parser::{parse_incompatibility, parse_requisite};
use crate::util::{course_level, is_level_7, random_delay};
use crate::writer::{MapWriter, RowWriter};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};

/// Everything the graph builder and analyzer (components H, I) need after a crawl
/// completes.
pub struct CrawlOutputs {
    pub edges: Vec<(String, String)>,
    pub conflicts: Vec<(String, String)>,
    pub pages: HashMap<String, CoursePage>,
}

#[derive(Default)]
struct HeartbeatStats {
    seen: usize,
    results: usize,
    queue: usize,
    edges: usize,
    conflicts: usize,
}

struct FetchOutcome {
    page: CoursePage,
    bundle: crate::parser::RequisiteBundle,
    incompat: Option<Node>,
}

pub struct CrawlDriver {
    config: CrawlConfig,
    fetcher: Arc<Fetcher>,
    output_dir: PathBuf,
}

impl CrawlDriver {
    pub fn new(config: CrawlConfig) -> anyhow::Result<Self> {
        let limiter = Arc::new(RateLimiter::new(config.rate, config.burst));
        let fetcher = Arc::new(Fetcher::new(limiter, config.base_url.clone())?);
        let output_dir = PathBuf::from(&config.output_dir);
        Ok(Self { config, fetcher, output_dir })
    }

    fn search_url(&self, keywords: &str, year: u32) -> String {
        let mut url = url::Url::parse(&self.config.base_url).expect("valid base url");
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base_path}/search.html"));
        url.query_pairs_mut()
            .append_pair("searchType", "coursecode")
            .append_pair("keywords", keywords)
            .append_pair("year", &year.to_string());
        url.to_string()
    }

    fn course_url(&self, code: &str) -> String {
        let mut url = url::Url::parse(&self.config.base_url).expect("valid base url");
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base_path}/course.html"));
        url.query_pairs_mut().append_pair("course_code", code);
        url.to_string()
    }

    /// Seed harvest: queries `year x digit x prefix` search buckets and unions the
    /// course codes found, filtered by level-7 exclusion and the target's level range.
    async fn harvest_seeds(&self) -> Vec<String> {
        let mut seeds: HashSet<String> = HashSet::new();

        for target in &self.config.targets {
            let prefixes: Vec<Option<&str>> = if target.prefixes.is_empty() {
                vec![None]
            } else {
                target.prefixes.iter().map(|p| Some(p.as_str())).collect()
            };

            for prefix in prefixes {
                for digit in 0..10u32 {
                    let keywords = match prefix {
                        Some(p) => format!("{p}{digit}***"),
                        None => format!("****{digit}***"),
                    };
                    let url = self.search_url(&keywords, target.year);
                    let Some(html) = self.fetcher.get_text(&url).await else {
                        continue;
                    };
                    for code in extract_course_codes(&html) {
                        if is_level_7(&code) {
                            continue;
                        }
                        if let Some(range) = &target.level_range {
                            match course_level(&code) {
                                Some(level) if level >= range.lo && level <= range.hi => {}
                                _ => continue,
                            }
                        }
                        seeds.insert(code);
                    }
                }
            }
        }

        let mut seeds: Vec<String> = seeds.into_iter().collect();
        seeds.sort();
        info!("[harvest] seeded {} courses", seeds.len());
        seeds
    }

    async fn fetch_one(fetcher: Arc<Fetcher>, url: String, code: String) -> FetchOutcome {
        let page = match fetcher.get_text(&url).await {
            Some(html) => parse_course_page(&code, &url, &html),
            None => CoursePage {
                code: code.clone(),
                url: url.clone(),
                ..Default::default()
            },
        };
        if page.is_empty() {
            let err = CrawlError::ParseEmpty { url: url.clone() };
            warn!("[crawl] {err}");
        }
        let bundle = parse_requisite(&page.prereq_raw);
        let incompat = parse_incompatibility(&page.incompat_raw);
        FetchOutcome { page, bundle, incompat }
    }

    /// Runs the full crawl: seed harvest, then BFS/DFS expansion batches gated by a
    /// concurrency semaphore, streaming rows/edges/conflicts as they are discovered.
    /// Returns the accumulated edge and conflict sets for the graph builder.
    pub async fn run(&self) -> anyhow::Result<CrawlOutputs> {
        std::fs::create_dir_all(&self.output_dir)?;

        let raw_writer = RowWriter::create(
            self.output_dir.join("courses_raw.csv"),
            &["course_code", "url", "title", "prereq_raw", "incompat_raw"],
        )?;
        let edges_writer = RowWriter::create(
            self.output_dir.join("edges_basic.csv"),
            &["course", "prereq"],
        )?;
        let conflicts_writer = RowWriter::create(
            self.output_dir.join("conflicts.csv"),
            &["course", "conflict_with"],
        )?;
        let structured_writer = if self.config.full_ast {
            Some(MapWriter::create(self.output_dir.join("prereq_structured.json"))?)
        } else {
            None
        };

        let seeds = self.harvest_seeds().await;
        std::fs::write(self.output_dir.join("all_courses.txt"), seeds.join("\n"))?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: Vec<String> = Vec::new();
        for s in &seeds {
            if seen.insert(s.clone()) {
                queue.push(s.clone());
            }
        }

        let mut edges: HashSet<(String, String)> = HashSet::new();
        let mut conflicts: HashSet<(String, String)> = HashSet::new();
        let mut pages: HashMap<String, CoursePage> = HashMap::new();

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency()));
        let stats = Arc::new(Mutex::new(HeartbeatStats::default()));
        let heartbeat = self.spawn_heartbeat(stats.clone());
        let start = Instant::now();

        while !queue.is_empty() {
            let cap = self.config.batch_cap();
            let mut batch = Vec::with_capacity(cap.min(queue.len()));
            while batch.len() < cap {
                match queue.pop() {
                    Some(code) => batch.push(code),
                    None => break,
                }
            }

            let mut tasks = FuturesUnordered::new();
            for code in batch {
                let fetcher = self.fetcher.clone();
                let sem = semaphore.clone();
                let url = self.course_url(&code);
                tasks.push(tokio::spawn(async move {
                    let _permit = sem.acquire_owned().await.expect("semaphore closed");
                    Self::fetch_one(fetcher, url, code).await
                }));
            }

            while let Some(joined) = tasks.next().await {
                let outcome = match joined {
                    Ok(o) => o,
                    Err(e) => {
                        warn!("[crawl] fetch task panicked: {e}");
                        continue;
                    }
                };
                self.apply_outcome(outcome, &mut seen, &mut queue, &mut edges, &mut conflicts, &mut pages, &raw_writer, &edges_writer, &conflicts_writer, &structured_writer);
            }

            {
                let mut s = stats.lock().await;
                s.seen = seen.len();
                s.results = pages.len();
                s.queue = queue.len();
                s.edges = edges.len();
                s.conflicts = conflicts.len();
            }

            if !queue.is_empty() {
                tokio::time::sleep(random_delay(50, 150)).await;
            }
        }

        heartbeat.abort();
        let _ = heartbeat.await;
        if let Some(w) = structured_writer {
            w.close();
        }

        info!(
            "[crawl] finished in {:.1}s: {} courses, {} edges, {} conflicts",
            start.elapsed().as_secs_f64(),
            pages.len(),
            edges.len(),
            conflicts.len()
        );

        Ok(CrawlOutputs {
            edges: edges.into_iter().collect(),
            conflicts: conflicts.into_iter().collect(),
            pages,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_outcome(
        &self,
        outcome: FetchOutcome,
        seen: &mut HashSet<String>,
        queue: &mut Vec<String>,
        edges: &mut HashSet<(String, String)>,
        conflicts: &mut HashSet<(String, String)>,
        pages: &mut HashMap<String, CoursePage>,
        raw_writer: &RowWriter,
        edges_writer: &RowWriter,
        conflicts_writer: &RowWriter,
        structured_writer: &Option<MapWriter>,
    ) {
        let code = outcome.page.code.clone();

        raw_writer.append(&[
            code.as_str(),
            outcome.page.url.as_str(),
            outcome.page.title.as_str(),
            outcome.page.prereq_raw.as_str(),
            outcome.page.incompat_raw.as_str(),
        ]);

        if let Some(w) = structured_writer {
            let value = serde_json::json!({
                "prereq": outcome.bundle.prereq,
                "coreq": outcome.bundle.coreq,
                "raw": outcome.bundle.raw,
                "incompat": outcome.incompat,
                "units": outcome.page.units_raw,
                "summary": outcome.page.summary,
            });
            w.put(&code, &value);
        }

        let mut referenced: Vec<String> = Vec::new();
        if let Some(node) = &outcome.bundle.prereq {
            for prereq_code in node.referenced_codes() {
                if prereq_code != code && !is_level_7(&prereq_code) {
                    if edges.insert((code.clone(), prereq_code.clone())) {
                        edges_writer.append(&[code.as_str(), prereq_code.as_str()]);
                    }
                    referenced.push(prereq_code);
                }
            }
        }
        if let Some(node) = &outcome.bundle.coreq {
            referenced.extend(node.referenced_codes());
        }

        if let Some(node) = &outcome.incompat {
            for other in node.referenced_codes() {
                if other == code || is_level_7(&other) || is_level_7(&code) {
                    continue;
                }
                let forward = (code.clone(), other.clone());
                let backward = (other.clone(), code.clone());
                if conflicts.insert(forward.clone()) {
                    conflicts_writer.append(&[forward.0.as_str(), forward.1.as_str()]);
                }
                if conflicts.insert(backward.clone()) {
                    conflicts_writer.append(&[backward.0.as_str(), backward.1.as_str()]);
                }
                referenced.push(other);
            }
        }

        for candidate in referenced {
            if !is_level_7(&candidate) && seen.insert(candidate.clone()) {
                queue.push(candidate);
            }
        }

        pages.insert(code, outcome.page);
    }

    fn spawn_heartbeat(&self, stats: Arc<Mutex<HeartbeatStats>>) -> tokio::task::JoinHandle<()> {
        let path = self.output_dir.join("heartbeat.log");
        let rate = self.config.rate;
        let burst = self.config.burst;
        let concurrency = self.config.concurrency();
        let start = Instant::now();

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(5)).await;
                let s = stats.lock().await;
                let line = format!(
                    "[hb] {} elapsed={:.0}s seen={} results={} queue={} edges={} conflicts={} rate={:.1} burst={} workers={}\n",
                    crate::util::get_pretty_time(),
                    start.elapsed().as_secs_f64(),
                    s.seen,
                    s.results,
                    s.queue,
                    s.edges,
                    s.conflicts,
                    rate,
                    burst,
                    concurrency
                );
                drop(s);
                use std::io::Write;
                if let Ok(mut f) = std::fs::OpenOptions::new().create(true).append(true).open(&path) {
                    let _ = f.write_all(line.as_bytes());
                }
            }
        })
    }
}
