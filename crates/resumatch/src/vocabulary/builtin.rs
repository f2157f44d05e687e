//! Built-in canonical corpora. These form vocabulary version 1.

use crate::tags::types::{
    CATEGORY_NON_TECHNICAL, CATEGORY_TECHNICAL, MARKET_AI, MARKET_FINANCE, MARKET_WEB3,
};

pub const CATEGORIES: &[&str] = &[CATEGORY_TECHNICAL, CATEGORY_NON_TECHNICAL];

pub const MARKETS: &[&str] = &[MARKET_WEB3, MARKET_AI, MARKET_FINANCE];

pub const TECHNICAL_SKILLS: &[&str] = &[
    "java", "go", "python", "rust", "c++", "后端", "前端", "全栈", "架构师", "cto", "sre",
    "android", "ios", "flutter", "cocos", "运维", "测试", "dba", "数据开发", "数据分析",
    "区块链开发", "合约", "solidity", "密码学", "安全", "量化开发", "量化策略",
];

pub const NON_TECHNICAL_SKILLS: &[&str] = &[
    "市场", "运营", "增长", "cmo", "pr", "公关", "销售", "bd", "产品", "设计", "行政", "法务",
    "风控", "合规", "devrel", "投资", "项目经理", "财务", "会计", "上币", "listing",
];

pub const WEB3_FIELDS: &[&str] = &[
    "defi", "dex", "layer1", "layer2", "zk", "rpc", "钱包", "质押", "借贷", "lending",
    "staking", "restaking", "支付", "amm", "mev", "挖矿", "tokenomics", "铭文", "meme", "法币",
    "c2c", "理财", "did", "perp", "perpetual", "indexer", "evm", "nft", "eth", "btc", "solana",
    "ton", "波卡", "cosmos", "ethereum", "流动性",
];

pub const AI_FIELDS: &[&str] = &[
    "ai", "ai agent", "大模型", "大语言模型", "rag", "生成式ai", "多模态", "向量数据库",
    "langchain", "智能体",
];

pub const FINANCE_FIELDS: &[&str] = &[
    "做市", "交易", "低延迟", "套利", "回测", "订单簿", "撮合", "滑点", "流动性", "合约", "现货",
    "期权", "衍生品", "永续", "期货", "风控", "杠杆", "量化", "网格", "外汇", "日内", "波段",
];

pub const EDUCATION: &[&str] = &[
    "985高校", "211高校", "本科", "硕士", "博士", "海外学历", "qs50", "清北", "qs100", "专科",
    "专升本",
];

/// Category-skill corpus for a category label.
pub fn skills_for_category(category: &str) -> &'static [&'static str] {
    match category {
        CATEGORY_TECHNICAL => TECHNICAL_SKILLS,
        CATEGORY_NON_TECHNICAL => NON_TECHNICAL_SKILLS,
        _ => &[],
    }
}

/// Market-field corpus for a market label.
pub fn fields_for_market(market: &str) -> &'static [&'static str] {
    match market {
        MARKET_WEB3 => WEB3_FIELDS,
        MARKET_AI => AI_FIELDS,
        MARKET_FINANCE => FINANCE_FIELDS,
        _ => &[],
    }
}
