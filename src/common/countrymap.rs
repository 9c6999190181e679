//! 国家名称映射表。
//!
//! 落地 IP 接口返回的国家字段可能是英文名或 ISO 两位代码，
//! 重命名阶段统一换算成中文名，查不到时原样返回。

use std::collections::HashMap;

use once_cell::sync::Lazy;

static EN_TO_CN: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("United States", "美国"),
        ("Japan", "日本"),
        ("Hong Kong", "香港"),
        ("Taiwan", "台湾"),
        ("Singapore", "新加坡"),
        ("South Korea", "韩国"),
        ("Korea", "韩国"),
        ("United Kingdom", "英国"),
        ("Germany", "德国"),
        ("France", "法国"),
        ("Netherlands", "荷兰"),
        ("The Netherlands", "荷兰"),
        ("Russia", "俄罗斯"),
        ("Canada", "加拿大"),
        ("Australia", "澳大利亚"),
        ("India", "印度"),
        ("Brazil", "巴西"),
        ("Turkey", "土耳其"),
        ("Vietnam", "越南"),
        ("Thailand", "泰国"),
        ("Malaysia", "马来西亚"),
        ("Indonesia", "印度尼西亚"),
        ("Philippines", "菲律宾"),
        ("Italy", "意大利"),
        ("Spain", "西班牙"),
        ("Sweden", "瑞典"),
        ("Switzerland", "瑞士"),
        ("Poland", "波兰"),
        ("Ukraine", "乌克兰"),
        ("Finland", "芬兰"),
        ("Norway", "挪威"),
        ("Denmark", "丹麦"),
        ("Austria", "奥地利"),
        ("Belgium", "比利时"),
        ("Ireland", "爱尔兰"),
        ("Portugal", "葡萄牙"),
        ("Czechia", "捷克"),
        ("Czech Republic", "捷克"),
        ("Romania", "罗马尼亚"),
        ("Hungary", "匈牙利"),
        ("Greece", "希腊"),
        ("Bulgaria", "保加利亚"),
        ("Israel", "以色列"),
        ("United Arab Emirates", "阿联酋"),
        ("Saudi Arabia", "沙特阿拉伯"),
        ("South Africa", "南非"),
        ("Egypt", "埃及"),
        ("Argentina", "阿根廷"),
        ("Chile", "智利"),
        ("Mexico", "墨西哥"),
        ("Colombia", "哥伦比亚"),
        ("New Zealand", "新西兰"),
        ("China", "中国"),
        ("Macao", "澳门"),
        ("Macau", "澳门"),
        ("Luxembourg", "卢森堡"),
        ("Estonia", "爱沙尼亚"),
        ("Latvia", "拉脱维亚"),
        ("Lithuania", "立陶宛"),
        ("Iceland", "冰岛"),
        ("Kazakhstan", "哈萨克斯坦"),
        ("Pakistan", "巴基斯坦"),
        ("Cambodia", "柬埔寨"),
        ("Laos", "老挝"),
        ("Myanmar", "缅甸"),
        ("Mongolia", "蒙古"),
        ("Nepal", "尼泊尔"),
        ("Sri Lanka", "斯里兰卡"),
        ("Qatar", "卡塔尔"),
        ("Kuwait", "科威特"),
        ("Bahrain", "巴林"),
        ("Oman", "阿曼"),
        ("Jordan", "约旦"),
        ("Morocco", "摩洛哥"),
        ("Kenya", "肯尼亚"),
        ("Seychelles", "塞舌尔"),
        ("Panama", "巴拿马"),
        ("Costa Rica", "哥斯达黎加"),
        ("Peru", "秘鲁"),
        ("Ecuador", "厄瓜多尔"),
        ("Uruguay", "乌拉圭"),
        ("Slovakia", "斯洛伐克"),
        ("Slovenia", "斯洛文尼亚"),
        ("Croatia", "克罗地亚"),
        ("Serbia", "塞尔维亚"),
        ("Moldova", "摩尔多瓦"),
        ("Georgia", "格鲁吉亚"),
        ("Armenia", "亚美尼亚"),
        ("Azerbaijan", "阿塞拜疆"),
        ("Cyprus", "塞浦路斯"),
        ("Malta", "马耳他"),
    ])
});

static CODE_TO_CN: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("US", "美国"),
        ("JP", "日本"),
        ("HK", "香港"),
        ("TW", "台湾"),
        ("SG", "新加坡"),
        ("KR", "韩国"),
        ("GB", "英国"),
        ("UK", "英国"),
        ("DE", "德国"),
        ("FR", "法国"),
        ("NL", "荷兰"),
        ("RU", "俄罗斯"),
        ("CA", "加拿大"),
        ("AU", "澳大利亚"),
        ("IN", "印度"),
        ("BR", "巴西"),
        ("TR", "土耳其"),
        ("VN", "越南"),
        ("TH", "泰国"),
        ("MY", "马来西亚"),
        ("ID", "印度尼西亚"),
        ("PH", "菲律宾"),
        ("IT", "意大利"),
        ("ES", "西班牙"),
        ("SE", "瑞典"),
        ("CH", "瑞士"),
        ("PL", "波兰"),
        ("UA", "乌克兰"),
        ("FI", "芬兰"),
        ("NO", "挪威"),
        ("DK", "丹麦"),
        ("AT", "奥地利"),
        ("BE", "比利时"),
        ("IE", "爱尔兰"),
        ("PT", "葡萄牙"),
        ("CZ", "捷克"),
        ("RO", "罗马尼亚"),
        ("HU", "匈牙利"),
        ("GR", "希腊"),
        ("BG", "保加利亚"),
        ("IL", "以色列"),
        ("AE", "阿联酋"),
        ("SA", "沙特阿拉伯"),
        ("ZA", "南非"),
        ("EG", "埃及"),
        ("AR", "阿根廷"),
        ("CL", "智利"),
        ("MX", "墨西哥"),
        ("CO", "哥伦比亚"),
        ("NZ", "新西兰"),
        ("CN", "中国"),
        ("MO", "澳门"),
        ("LU", "卢森堡"),
        ("EE", "爱沙尼亚"),
        ("LV", "拉脱维亚"),
        ("LT", "立陶宛"),
        ("IS", "冰岛"),
        ("KZ", "哈萨克斯坦"),
        ("PK", "巴基斯坦"),
        ("KH", "柬埔寨"),
        ("LA", "老挝"),
        ("MM", "缅甸"),
        ("MN", "蒙古"),
        ("NP", "尼泊尔"),
        ("LK", "斯里兰卡"),
        ("QA", "卡塔尔"),
        ("KW", "科威特"),
        ("BH", "巴林"),
        ("OM", "阿曼"),
        ("JO", "约旦"),
        ("MA", "摩洛哥"),
        ("KE", "肯尼亚"),
        ("SC", "塞舌尔"),
        ("PA", "巴拿马"),
        ("CR", "哥斯达黎加"),
        ("PE", "秘鲁"),
        ("EC", "厄瓜多尔"),
        ("UY", "乌拉圭"),
        ("SK", "斯洛伐克"),
        ("SI", "斯洛文尼亚"),
        ("HR", "克罗地亚"),
        ("RS", "塞尔维亚"),
        ("MD", "摩尔多瓦"),
        ("GE", "格鲁吉亚"),
        ("AM", "亚美尼亚"),
        ("AZ", "阿塞拜疆"),
        ("CY", "塞浦路斯"),
        ("MT", "马耳他"),
    ])
});

/// 英文名或 ISO 代码换算中文名，查不到时原样返回。
pub fn chinese_name(country: &str) -> &str {
    let trimmed = country.trim();
    if let Some(cn) = EN_TO_CN.get(trimmed) {
        return cn;
    }
    if let Some(cn) = CODE_TO_CN.get(trimmed.to_ascii_uppercase().as_str()) {
        return cn;
    }
    country
}

/// 由 ISO 两位代码推导国旗 emoji（区域指示符拼接）。
pub fn flag_emoji(code: &str) -> Option<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    let mut flag = String::new();
    for b in code.bytes() {
        flag.push(char::from_u32(0x1F1E6 + (b - b'A') as u32)?);
    }
    Some(flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_lookup_accepts_english_and_code() {
        assert_eq!(chinese_name("United States"), "美国");
        assert_eq!(chinese_name("hk"), "香港");
        assert_eq!(chinese_name("Atlantis"), "Atlantis");
    }

    #[test]
    fn flag_derives_from_iso_code() {
        assert_eq!(flag_emoji("us").as_deref(), Some("🇺🇸"));
        assert_eq!(flag_emoji("JPN"), None);
    }
}
