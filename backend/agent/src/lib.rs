pub mod peer_skills;
pub mod router;
pub mod skill_table;
pub mod skills;

pub use peer_skills::{ListRemoteAgents, SendTask};
pub use router::{default_skill_table, KeywordRouter, RouteTarget, RoutingRule};
pub use skill_table::SkillTable;
pub use skills::{ConvertCurrency, CountProducts, DEMO_RATE};
