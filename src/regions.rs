/// A 시/도 and its SGIS administrative code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub name: &'static str,
    pub code: &'static str,
}

pub static REGIONS: [Region; 17] = [
    Region { name: "서울특별시", code: "11" },
    Region { name: "부산광역시", code: "26" },
    Region { name: "대구광역시", code: "27" },
    Region { name: "인천광역시", code: "28" },
    Region { name: "광주광역시", code: "29" },
    Region { name: "대전광역시", code: "30" },
    Region { name: "울산광역시", code: "31" },
    Region { name: "세종특별자치시", code: "36" },
    Region { name: "경기도", code: "41" },
    Region { name: "강원특별자치도", code: "51" },
    Region { name: "충청북도", code: "43" },
    Region { name: "충청남도", code: "44" },
    Region { name: "전라북도", code: "45" },
    Region { name: "전라남도", code: "46" },
    Region { name: "경상북도", code: "47" },
    Region { name: "경상남도", code: "48" },
    Region { name: "제주특별자치도", code: "50" },
];

/// Finds a region by name or by code.
pub fn lookup(name_or_code: &str) -> Option<&'static Region> {
    let wanted = name_or_code.trim();
    REGIONS
        .iter()
        .find(|r| r.name == wanted || r.code == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_code() {
        assert_eq!(lookup("서울특별시").map(|r| r.code), Some("11"));
        assert_eq!(lookup(" 50 ").map(|r| r.name), Some("제주특별자치도"));
        assert_eq!(lookup("서울"), None);
    }

    #[test]
    fn codes_are_unique() {
        let mut codes: Vec<_> = REGIONS.iter().map(|r| r.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), REGIONS.len());
    }
}
