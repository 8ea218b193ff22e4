//! Shipping regions offered by the address form.
//!
//! Three levels: province, city, district. Municipalities list themselves
//! as their only city.

/// A city and its districts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct City {
    pub name: &'static str,
    pub districts: &'static [&'static str],
}

/// A province and its cities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Province {
    pub name: &'static str,
    pub cities: &'static [City],
}

const fn city(name: &'static str, districts: &'static [&'static str]) -> City {
    City { name, districts }
}

/// Every selectable province.
pub const PROVINCES: &[Province] = &[
    Province {
        name: "Beijing",
        cities: &[city("Beijing", &["Dongcheng", "Xicheng", "Chaoyang", "Haidian"])],
    },
    Province {
        name: "Shanghai",
        cities: &[city("Shanghai", &["Huangpu", "Jing'an", "Xuhui", "Pudong"])],
    },
    Province {
        name: "Guangdong",
        cities: &[
            city("Shenzhen", &["Futian", "Nanshan", "Luohu"]),
            city("Guangzhou", &["Tianhe", "Yuexiu", "Haizhu"]),
            city("Dongguan", &["Nancheng", "Dongcheng", "Humen"]),
            city("Foshan", &["Chancheng", "Nanhai", "Shunde"]),
        ],
    },
    Province {
        name: "Zhejiang",
        cities: &[
            city("Hangzhou", &["Xihu", "Shangcheng", "Binjiang"]),
            city("Ningbo", &["Haishu", "Jiangbei", "Yinzhou"]),
            city("Wenzhou", &["Lucheng", "Longwan", "Ouhai"]),
            city("Jiaxing", &["Nanhu", "Xiuzhou"]),
        ],
    },
    Province {
        name: "Jiangsu",
        cities: &[
            city("Nanjing", &["Xuanwu", "Qinhuai", "Gulou"]),
            city("Suzhou", &["Gusu", "Wuzhong", "Huqiu"]),
            city("Wuxi", &["Liangxi", "Binhu", "Xishan"]),
            city("Changzhou", &["Tianning", "Zhonglou", "Wujin"]),
        ],
    },
    Province {
        name: "Sichuan",
        cities: &[
            city("Chengdu", &["Jinjiang", "Wuhou", "Qingyang"]),
            city("Mianyang", &["Fucheng", "Youxian"]),
        ],
    },
];

/// Look up a province by name.
#[must_use]
pub fn province(name: &str) -> Option<&'static Province> {
    PROVINCES.iter().find(|province| province.name == name)
}

/// Cities of a province; empty for an unknown one.
#[must_use]
pub fn cities(province_name: &str) -> &'static [City] {
    province(province_name)
        .map(|province| province.cities)
        .unwrap_or_default()
}

/// Districts of a city within a province; empty unless both are known.
#[must_use]
pub fn districts(province_name: &str, city_name: &str) -> &'static [&'static str] {
    cities(province_name)
        .iter()
        .find(|city| city.name == city_name)
        .map(|city| city.districts)
        .unwrap_or_default()
}

/// Whether the three names form one chain of the table.
#[must_use]
pub fn contains(province_name: &str, city_name: &str, district: &str) -> bool {
    districts(province_name, city_name).contains(&district)
}
